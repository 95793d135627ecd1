//! Request dispatch.
//!
//! [`Dispatcher`] resolves a path, runs view middleware and calls the view.
//! [`Dispatcher::into_axum_router`] exposes it as an axum router that
//! answers every path, percent-decoding it before resolution.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::any;
use http::StatusCode;
use pathconv_core::logging::request_span;
use percent_encoding::percent_decode_str;
use pathconv_core::{PathconvResult, Settings};
use tracing::Instrument;

use crate::middleware::{middleware_from_settings, ViewMiddleware};
use crate::urls::resolver::URLResolver;

/// Resolves paths and runs the matched views.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use pathconv_core::ConverterSettings;
/// use pathconv_urls::converters::registry::ConverterRegistry;
/// use pathconv_urls::urls::pattern::{path_with, view};
/// use pathconv_urls::urls::resolver::{root, URLEntry};
/// use pathconv_urls::{Dispatcher, QueryBatcherMiddleware};
///
/// let registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
/// let echo = view(|m| async move { Ok(m.kwargs["n"].to_string()) });
/// let urls = root(vec![URLEntry::Pattern(
///     path_with(&registry, "n/<int:n>/", echo, None).unwrap(),
/// )])
/// .unwrap();
///
/// let dispatcher = Dispatcher::new(urls).middleware(QueryBatcherMiddleware);
/// assert_eq!(dispatcher.dispatch("/n/7/").await.unwrap(), "7");
/// # }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    url_conf: Arc<URLResolver>,
    middleware: Vec<Arc<dyn ViewMiddleware>>,
}

impl Dispatcher {
    /// Creates a dispatcher without middleware.
    pub fn new(url_conf: URLResolver) -> Self {
        Self {
            url_conf: Arc::new(url_conf),
            middleware: Vec::new(),
        }
    }

    /// Creates a dispatcher with the middleware named in `settings`.
    pub fn from_settings(url_conf: URLResolver, settings: &Settings) -> PathconvResult<Self> {
        Ok(Self {
            url_conf: Arc::new(url_conf),
            middleware: middleware_from_settings(settings)?,
        })
    }

    /// Appends a view middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: impl ViewMiddleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Returns the URL configuration.
    pub fn url_conf(&self) -> &URLResolver {
        &self.url_conf
    }

    /// Returns the number of view middleware.
    pub fn middleware_count(&self) -> usize {
        self.middleware.len()
    }

    /// Resolves `path` (with or without its leading slash), runs the view
    /// middleware in order and calls the view.
    pub async fn dispatch(&self, path: &str) -> PathconvResult<String> {
        let span = request_span(path);
        async {
            let relative = path.strip_prefix('/').unwrap_or(path);
            let mut resolver_match = self.url_conf.resolve(relative).await?;
            tracing::debug!(route = %resolver_match.route, view = %resolver_match.view_name(), "resolved");

            for mw in &self.middleware {
                mw.process_view(&mut resolver_match).await?;
            }
            resolver_match.call().await
        }
        .instrument(span)
        .await
    }

    /// Dispatches and maps the outcome to a status code and body.
    pub async fn respond(&self, path: &str) -> (StatusCode, String) {
        match self.dispatch(path).await {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => {
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(path = %path, error = %e, "view failed");
                }
                (status, e.to_string())
            }
        }
    }

    /// Converts the dispatcher into an axum router that answers every path.
    ///
    /// The request path is percent-decoded before it is resolved; a path
    /// that does not decode to UTF-8 gets a 400.
    pub fn into_axum_router(self) -> axum::Router {
        let dispatcher = Arc::new(self);

        let handler = move |req: Request<Body>| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                let raw = req.uri().path().to_owned();
                match percent_decode_str(&raw).decode_utf8() {
                    Ok(path) => dispatcher.respond(&path).await.into_response(),
                    Err(e) => {
                        tracing::debug!(path = %raw, error = %e, "undecodable path");
                        (StatusCode::BAD_REQUEST, format!("Request path is not valid UTF-8: {e}"))
                            .into_response()
                    }
                }
            }
        };

        axum::Router::new()
            .route("/{*path}", any(handler.clone()))
            .route("/", any(handler))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("url_conf", &self.url_conf)
            .field("middleware_count", &self.middleware.len())
            .finish()
    }
}
