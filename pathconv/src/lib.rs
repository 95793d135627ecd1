//! # pathconv
//!
//! Typed URL path converters for django-rs style routing.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on
//! `pathconv` for everything, or on individual crates for finer-grained
//! control.
//!
//! ## Quick start
//!
//! ```
//! use pathconv::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
//! let by_week = view(|m| async move { Ok(format!("week of {}", m.kwargs["week"])) });
//! let urls = root(vec![URLEntry::Pattern(
//!     path_with(&registry, "archive/<week:week>/", by_week, Some("archive")).unwrap(),
//! )])
//! .unwrap();
//!
//! let dispatcher = Dispatcher::new(urls).middleware(QueryBatcherMiddleware);
//! assert_eq!(
//!     dispatcher.dispatch("/archive/2023-W03/").await.unwrap(),
//!     "week of 2023-01-16"
//! );
//! # }
//! ```

/// Settings, errors, logging and shared helpers.
pub use pathconv_core as core;

/// Models, in-memory stores, query sets, lazy objects and batch loading.
pub use pathconv_db as db;

/// Converters, the converter registry, routing and dispatch.
pub use pathconv_urls as urls;

/// Introspection commands: `list_converters`, `converter_table`,
/// `check_converters` and `url_overlap`.
#[cfg(feature = "cli")]
pub use pathconv_cli as cli;

/// Fixtures, query-count assertions and a test client.
#[cfg(feature = "testing")]
pub use pathconv_test as test;

// Third-party crates the public API is built on, re-exported so applications
// use the same versions.
pub use async_trait;
pub use axum;
pub use chrono;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;

/// Commonly used types, re-exported for glob import.
pub mod prelude {
    pub use pathconv_core::{ConverterSettings, PathconvError, PathconvResult, Settings};
    pub use pathconv_db::{Databases, InMemoryStore, LazyObject, Model, ModelRegistry, QuerySet};
    pub use pathconv_urls::converters::objects::{Loading, ModelObjectConverter};
    pub use pathconv_urls::urls::pattern::{path, path_with, re_path, view};
    pub use pathconv_urls::urls::reverse::reverse;
    pub use pathconv_urls::urls::resolver::{include, root};
    pub use pathconv_urls::{
        ConverterRegistry, Dispatcher, PathConverter, PathValue, QueryBatcherMiddleware, URLEntry,
        URLResolver,
    };
}
