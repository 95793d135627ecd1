//! Utility types and helpers.
//!
//! - [`regex`] - Capture-group stripping for composing converter regexes
//! - [`one_or_many`] - [`OneOrMany`] for single-or-multiple declarations
//! - [`html`] - HTML escaping

pub mod html;
pub mod one_or_many;
pub mod regex;

pub use html::escape_html;
pub use one_or_many::OneOrMany;
pub use self::regex::{anchored, strip_capture_groups};
