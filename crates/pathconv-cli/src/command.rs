//! Management command framework.
//!
//! [`ManagementCommand`] defines one subcommand of the `pathconv` utility and
//! [`CommandRegistry`] collects them into a clap CLI and dispatches to them.
//! Commands return the process exit status, so audits can fail a CI job by
//! reporting how many problems they found.
//!
//! ## Defining a Custom Command
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use pathconv_cli::command::ManagementCommand;
//! use pathconv_core::{PathconvResult, Settings};
//!
//! struct CountCommand;
//!
//! #[async_trait]
//! impl ManagementCommand for CountCommand {
//!     fn name(&self) -> &str { "count_converters" }
//!     fn help(&self) -> &str { "Print the number of registered converters" }
//!
//!     async fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!     ) -> PathconvResult<u8> {
//!         println!("{}", pathconv_urls::registry().names().len());
//!         Ok(0)
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult, Settings};

/// A subcommand of the management utility.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// Returns the name used to invoke the command.
    fn name(&self) -> &str;

    /// Returns a short help description.
    fn help(&self) -> &str;

    /// Adds custom arguments to the clap command.
    ///
    /// The default implementation returns the command unchanged.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command and returns its exit status.
    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> PathconvResult<u8>;
}

/// Management commands, ordered by name.
#[derive(Default)]
pub struct CommandRegistry {
    by_name: BTreeMap<String, Box<dyn ManagementCommand>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command. A later command with the same name wins.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        if let Some(previous) = self.by_name.insert(command.name().to_owned(), command) {
            tracing::debug!(command = %previous.name(), "management command replaced");
        }
    }

    /// Looks a command up by name.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.by_name.get(name).map(Box::as_ref)
    }

    /// Returns the registered command names in alphabetical order.
    pub fn list_commands(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns `true` if no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Builds the top-level clap command with one subcommand per registered
    /// command and a global `--settings` option.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("pathconv")
            .about("pathconv management utility")
            .subcommand_required(true)
            .arg(
                clap::Arg::new("settings")
                    .long("settings")
                    .global(true)
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(std::path::PathBuf))
                    .help("TOML or JSON settings file (PATHCONV_* variables still apply)"),
            );

        for (name, cmd) in &self.by_name {
            // clap wants 'static names; commands are registered once at startup.
            let name: &'static str = Box::leak(name.clone().into_boxed_str());
            let sub = clap::Command::new(name).about(cmd.help().to_owned());
            app = app.subcommand(cmd.add_arguments(sub));
        }
        app
    }

    /// Runs the subcommand selected in `matches` and returns its exit status.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> PathconvResult<u8> {
        let Some((name, args)) = matches.subcommand() else {
            return Err(PathconvError::ConfigurationError(
                "no management command given".to_string(),
            ));
        };
        let command = self.get(name).ok_or_else(|| {
            PathconvError::ConfigurationError(format!("unknown management command '{name}'"))
        })?;

        tracing::debug!(command = %name, "running management command");
        let status = command.handle(args, settings).await?;
        tracing::debug!(command = %name, status, "management command finished");
        Ok(status)
    }
}
