//! # pathconv-core
//!
//! Core types shared by every pathconv crate. This crate has no dependency on
//! the other workspace members.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Settings and the global configuration container
//! - [`settings_loader`] - Loading settings from TOML, JSON and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - Regex composition helpers, `OneOrMany`, HTML escaping

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{PathconvError, PathconvResult};
pub use settings::{ConverterSettings, LazyProbeMode, OverlapSettings, Settings, SETTINGS};
