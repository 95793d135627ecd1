//! URL routing with typed converters.
//!
//! - [`pattern`]: URL pattern definitions via `path()` and `re_path()`
//! - [`resolver`]: Hierarchical URL resolution with namespace support
//! - [`reverse`]: Reverse URL generation through converter `to_url`
//!
//! Paths are resolved without their leading slash (`articles/2024/`), and
//! [`reverse::reverse`] prepends one.

pub mod pattern;
pub mod resolver;
pub mod reverse;
