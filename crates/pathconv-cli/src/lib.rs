//! # pathconv-cli
//!
//! Management commands that introspect and audit path converters and URL
//! configurations.
//!
//! - [`command`] - The [`ManagementCommand`] trait and [`CommandRegistry`]
//! - [`commands`] - `list_converters`, `converter_table`, `url_overlap` and
//!   `check_converters`
//! - [`table`] - Text, HTML and Markdown converter tables
//! - [`overlap`] - DFA-based route overlap analysis
//!
//! ## Quick Start
//!
//! ```rust
//! use pathconv_cli::command::CommandRegistry;
//! use pathconv_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert_eq!(
//!     names,
//!     vec!["check_converters", "converter_table", "list_converters", "url_overlap"]
//! );
//! ```

// - result_large_err: PathconvError is the workspace-wide error type
// - unused_async: command handlers keep a uniform async signature
#![allow(clippy::result_large_err)]
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;
pub mod overlap;
pub mod table;

pub use command::{CommandRegistry, ManagementCommand};
pub use overlap::{analyze, Finding, OverlapReport, RouteAutomaton};
