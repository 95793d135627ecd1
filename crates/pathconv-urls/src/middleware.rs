//! View middleware.
//!
//! View middleware runs after URL resolution and before the view, with
//! mutable access to the converted keyword arguments. The only built-in,
//! [`QueryBatcherMiddleware`], groups the unresolved lazy objects of a
//! request by database so they share one [`BatchLoader`] per database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult, Settings};
use pathconv_db::{BatchLoader, BatchLoaderManager, ObjectRef};

use crate::converters::PathValue;
use crate::urls::resolver::ResolverMatch;

/// Settings name of [`QueryBatcherMiddleware`].
pub const QUERY_BATCHER: &str = "pathconv.middleware.QueryBatcherMiddleware";

/// A component that inspects or rewrites a match before the view runs.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use pathconv_core::PathconvResult;
/// use pathconv_urls::middleware::ViewMiddleware;
/// use pathconv_urls::ResolverMatch;
///
/// struct DropEmpty;
///
/// #[async_trait]
/// impl ViewMiddleware for DropEmpty {
///     async fn process_view(&self, m: &mut ResolverMatch) -> PathconvResult<()> {
///         m.kwargs.retain(|_, v| !v.is_null());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ViewMiddleware: Send + Sync {
    /// Processes the match. An error short-circuits the request.
    async fn process_view(&self, resolver_match: &mut ResolverMatch) -> PathconvResult<()>;
}

/// Attaches a shared batch loader to every unresolved lazy object of a
/// request, one loader per database alias. Never queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryBatcherMiddleware;

impl QueryBatcherMiddleware {
    /// Groups the unresolved objects among `kwargs` (including those inside
    /// tuples) and returns the loaders, keyed by database alias.
    pub fn batch(&self, kwargs: &HashMap<String, PathValue>) -> BatchLoaderManager {
        let mut names: Vec<&String> = kwargs.keys().collect();
        names.sort();

        let mut objects = Vec::new();
        for name in names {
            collect_objects(&kwargs[name], &mut objects);
        }

        let mut manager = BatchLoaderManager::new();
        for obj in objects.iter().filter(|o| !o.is_resolved()) {
            let loader: Arc<BatchLoader> = manager.loader(obj.db());
            loader.add(obj);
            obj.set_batch_loader(loader);
        }

        for loader in manager.loaders() {
            tracing::debug!(db = %loader.db(), objects = loader.len(), "batched lazy objects");
        }
        manager
    }
}

fn collect_objects(value: &PathValue, out: &mut Vec<ObjectRef>) {
    match value {
        PathValue::Object(obj) => out.push(Arc::clone(obj)),
        PathValue::Tuple(fields) => {
            for (_, v) in fields {
                collect_objects(v, out);
            }
        }
        _ => {}
    }
}

#[async_trait]
impl ViewMiddleware for QueryBatcherMiddleware {
    async fn process_view(&self, resolver_match: &mut ResolverMatch) -> PathconvResult<()> {
        self.batch(&resolver_match.kwargs);
        Ok(())
    }
}

/// Instantiates the view middleware named in `settings.middleware`, in order.
///
/// # Errors
///
/// [`PathconvError::ImproperlyConfigured`] for unknown names.
pub fn middleware_from_settings(settings: &Settings) -> PathconvResult<Vec<Arc<dyn ViewMiddleware>>> {
    settings
        .middleware
        .iter()
        .map(|name| match name.as_str() {
            QUERY_BATCHER => Ok(Arc::new(QueryBatcherMiddleware) as Arc<dyn ViewMiddleware>),
            other => Err(PathconvError::ImproperlyConfigured(format!(
                "Unknown middleware '{other}'"
            ))),
        })
        .collect()
}
