//! # pathconv-db
//!
//! The ORM-facing side of pathconv. Converters that turn URL fragments into
//! model instances need to describe models, look records up and defer those
//! lookups until a view actually touches the object.
//!
//! ## Modules
//!
//! - [`value`] - Backend-agnostic [`Value`] and typed extraction
//! - [`model`] - [`Model`] trait, [`ModelMeta`], field kinds and [`Row`]
//! - [`store`] - The [`ObjectStore`] trait and the in-memory backend
//! - [`queryset`] - Exact-match [`QuerySet`]
//! - [`router`] - Database alias to store mapping built from settings
//! - [`registry`] - Type-erased model lookup by app label and model name
//! - [`lazy`] - [`LazyObject`], the resolve-on-first-access proxy
//! - [`batch`] - [`BatchLoader`] grouping of unresolved proxies

pub mod batch;
pub mod lazy;
pub mod model;
pub mod queryset;
pub mod registry;
pub mod router;
pub mod store;
pub mod value;

pub use batch::{BatchLoader, BatchLoaderManager};
pub use lazy::{downcast, AnyLazyObject, LazyObject, ObjectRef};
pub use model::{FieldDef, FieldKind, Model, ModelMeta, Row};
pub use queryset::QuerySet;
pub use registry::{ModelHandle, ModelRegistry};
pub use router::{Databases, DEFAULT_DB_ALIAS};
pub use store::{InMemoryStore, Lookup, ObjectStore};
pub use value::{FromValue, Value};
