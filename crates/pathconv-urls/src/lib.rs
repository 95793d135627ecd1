//! # pathconv-urls
//!
//! Typed URL path converters and the routing layer that uses them.
//!
//! A converter pairs a regex with a parser and a renderer: `to_value` turns a
//! matched path fragment into a [`PathValue`], `to_url` turns a value back
//! into a fragment. Converters are registered by name in a
//! [`ConverterRegistry`] and referenced from routes as `<name:param>`.
//!
//! ## Modules
//!
//! - [`converters`] - The converter contract, built-ins, mixins and registry
//! - [`urls`] - `path()`/`re_path()`/`include()`, resolution and `reverse()`
//! - [`middleware`] - View middleware, including [`QueryBatcherMiddleware`]
//! - [`dispatch`] - Resolve, run middleware and call the view; axum adapter
//!
//! # Examples
//!
//! ```
//! use pathconv_urls::converters::registry::ConverterRegistry;
//! use pathconv_urls::urls::pattern::{path_with, view};
//! use pathconv_urls::urls::resolver::{root, URLEntry};
//! use pathconv_core::settings::ConverterSettings;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
//! let home = view(|_m| async { Ok("ok".to_string()) });
//! let urls = root(vec![URLEntry::Pattern(
//!     path_with(&registry, "archive/<date:day>/", home, Some("archive")).unwrap(),
//! )])
//! .unwrap();
//!
//! let m = urls.resolve("archive/2023-01-21/").await.unwrap();
//! assert_eq!(m.kwargs["day"].to_string(), "2023-01-21");
//! # }
//! ```

pub mod converters;
pub mod dispatch;
pub mod middleware;
pub mod urls;

pub use converters::registry::{registry, registry_mut, verify_registry, ConverterRegistry};
pub use converters::{
    ConverterInfo, ConverterName, ConverterSummary, PathConverter, PathValue, ValueKind,
};
pub use dispatch::Dispatcher;
pub use middleware::{QueryBatcherMiddleware, ViewMiddleware};
pub use urls::resolver::{ResolverMatch, URLEntry, URLResolver};
