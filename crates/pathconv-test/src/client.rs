//! HTTP test client for pathconv applications.
//!
//! [`TestClient`] sends simulated requests through the axum router of a
//! [`Dispatcher`], so path conversion, view middleware and error mapping all
//! run exactly as they would behind a server.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pathconv_core::ConverterSettings;
//! use pathconv_test::client::TestClient;
//! use pathconv_urls::urls::pattern::{path_with, view};
//! use pathconv_urls::urls::resolver::{root, URLEntry};
//! use pathconv_urls::{ConverterRegistry, Dispatcher};
//!
//! async fn example() {
//!     let registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
//!     let hello = view(|m| async move { Ok(format!("Hello, {}!", m.kwargs["name"])) });
//!     let urls = root(vec![URLEntry::Pattern(
//!         path_with(&registry, "hello/<str:name>/", hello, None).unwrap(),
//!     )])
//!     .unwrap();
//!
//!     let client = TestClient::new(Dispatcher::new(urls));
//!     let response = client.get("/hello/World/").await;
//!     assert_eq!(response.status_code(), 200);
//!     assert_eq!(response.text(), "Hello, World!");
//! }
//! ```

use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use tower::ServiceExt;

use pathconv_urls::Dispatcher;

/// A test client for making simulated HTTP requests against a dispatcher.
#[derive(Clone)]
pub struct TestClient {
    app: Router,
}

impl TestClient {
    /// Creates a client serving `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            app: dispatcher.into_axum_router(),
        }
    }

    /// Sends a GET request to the given path.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path).await
    }

    /// Sends a HEAD request to the given path.
    pub async fn head(&self, path: &str) -> TestResponse {
        self.request(Method::HEAD, path).await
    }

    /// Sends a bodiless request with the given method.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid URI.
    pub async fn request(&self, method: Method, path: &str) -> TestResponse {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .expect("request builder should not fail");
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map(|b| b.to_vec())
            .unwrap_or_default();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient").finish_non_exhaustive()
    }
}

/// The response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body as raw bytes.
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Returns the response body as a UTF-8 string.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Returns the numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the value of a header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns `true` if the response body contains the given text.
    pub fn contains(&self, text: &str) -> bool {
        self.text().contains(text)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::fixtures::{converter_registry, seeded_databases};
    use pathconv_core::ConverterSettings;
    use pathconv_urls::urls::pattern::{path_with, view};
    use pathconv_urls::urls::resolver::{root, URLEntry};
    use pathconv_urls::urls::reverse::reverse;
    use pathconv_urls::{PathValue, QueryBatcherMiddleware, URLResolver};

    async fn url_conf() -> URLResolver {
        let (_, _, databases) = seeded_databases();
        let registry = converter_registry(ConverterSettings::default(), databases).await;
        let show = view(|m| async move {
            match &m.kwargs["obj"] {
                PathValue::Object(obj) => {
                    obj.resolve().await?;
                    Ok(obj
                        .known_field_value("username")
                        .map(|v| v.to_string())
                        .unwrap_or_default())
                }
                other => Ok(other.to_string()),
            }
        });
        let double = view(|m| async move {
            match m.kwargs["n"] {
                PathValue::Int(n) => Ok((n * 2).to_string()),
                _ => Ok(String::new()),
            }
        });
        let label = view(|m| async move {
            match &m.kwargs["label"] {
                PathValue::Str(s) => Ok(s.clone()),
                other => Ok(other.to_string()),
            }
        });
        let filter = view(|m| async move { Ok(m.kwargs["filter"].to_string()) });
        root(vec![
            URLEntry::Pattern(path_with(&registry, "obj/<object:obj>/", show, None).unwrap()),
            URLEntry::Pattern(path_with(&registry, "double/<int:n>/", double, None).unwrap()),
            URLEntry::Pattern(path_with(&registry, "label/<str:label>/", label, Some("label")).unwrap()),
            URLEntry::Pattern(path_with(&registry, "filter/<json:filter>/", filter, Some("filter")).unwrap()),
        ])
        .unwrap()
    }

    async fn client() -> TestClient {
        TestClient::new(Dispatcher::new(url_conf().await).middleware(QueryBatcherMiddleware))
    }

    #[tokio::test]
    async fn test_get_ok() {
        let response = client().await.get("/double/21/").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "42");
    }

    #[tokio::test]
    async fn test_object_view() {
        let response = client().await.get("/obj/auth/user/12/").await;
        assert_eq!(response.status_code(), 200);
        assert!(response.contains("Foo"));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let response = client().await.get("/obj/auth/user/99/").await;
        assert_eq!(response.status_code(), 404);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let client = client().await;
        assert_eq!(client.get("/nowhere/").await.status, StatusCode::NOT_FOUND);
        assert_eq!(client.head("/double/x/").await.status_code(), 404);
    }

    #[tokio::test]
    async fn test_encoded_paths_are_decoded() {
        let client = client().await;
        let response = client.get("/label/with%20space/").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "with space");

        let response = client.get("/filter/%7B%22id%22:%205%7D/").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), r#"{"id":5}"#);

        assert_eq!(client.get("/label/%C3%28/").await.status_code(), 400);
    }

    #[tokio::test]
    async fn test_reversed_urls_round_trip() {
        let urls = url_conf().await;
        let client = client().await;

        let kwargs = HashMap::from([("label", PathValue::Str("a b?c#d".into()))]);
        let url = reverse("label", &kwargs, &urls).unwrap();
        assert_eq!(url, "/label/a%20b%3Fc%23d/");
        assert_eq!(client.get(&url).await.text(), "a b?c#d");

        let kwargs = HashMap::from([("filter", PathValue::Json(serde_json::json!({"tags": ["x y"]})))]);
        let url = reverse("filter", &kwargs, &urls).unwrap();
        let response = client.get(&url).await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), r#"{"tags":["x y"]}"#);
    }
}
