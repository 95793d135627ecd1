//! Built-in management commands.
//!
//! Each command implements
//! [`ManagementCommand`](crate::command::ManagementCommand).

pub mod check_converters;
pub mod converter_table;
pub mod list_converters;
pub mod url_overlap;

pub use check_converters::CheckConvertersCommand;
pub use converter_table::ConverterTableCommand;
pub use list_converters::ListConvertersCommand;
pub use url_overlap::UrlOverlapCommand;

use crate::command::CommandRegistry;

/// Registers all built-in management commands into the given registry.
///
/// `url_overlap` is registered without a URL configuration; register a
/// [`UrlOverlapCommand::with_url_conf`] instance afterwards to replace it.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(ListConvertersCommand));
    registry.register(Box::new(ConverterTableCommand));
    registry.register(Box::new(UrlOverlapCommand::new()));
    registry.register(Box::new(CheckConvertersCommand));
}
