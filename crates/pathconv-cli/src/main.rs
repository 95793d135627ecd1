//! The `pathconv` management utility.
//!
//! ```bash
//! pathconv list_converters --format json
//! pathconv converter_table > converters.html
//! pathconv url_overlap --route 'users/<str:name>/' --route 'users/<int:pk>/'
//! pathconv --settings pathconv.toml check_converters
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use pathconv_cli::command::CommandRegistry;
use pathconv_cli::commands::register_builtin_commands;
use pathconv_core::logging::setup_logging;
use pathconv_core::settings_loader::{from_env, from_file_with_env};
use pathconv_core::{PathconvResult, Settings, SETTINGS};

fn load_settings(path: Option<&PathBuf>) -> PathconvResult<Settings> {
    match path {
        Some(path) => from_file_with_env(path),
        None => Ok(from_env()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut commands = CommandRegistry::new();
    register_builtin_commands(&mut commands);
    let matches = commands.build_cli().get_matches();

    let settings = match load_settings(matches.get_one::<PathBuf>("settings")) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&settings);
    SETTINGS.configure(settings.clone());

    match commands.execute(&matches, &settings).await {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
