//! The `converter_table` management command.
//!
//! Prints the registered converters as an HTML (or Markdown) table sorted by
//! name, for pasting into documentation.

use async_trait::async_trait;
use pathconv_core::{PathconvResult, Settings};

use super::list_converters::summaries;
use crate::command::ManagementCommand;
use crate::table::{html_table, markdown_table};

/// Prints a documentation table of the registered converters.
pub struct ConverterTableCommand;

#[async_trait]
impl ManagementCommand for ConverterTableCommand {
    fn name(&self) -> &'static str {
        "converter_table"
    }

    fn help(&self) -> &'static str {
        "Create a table of the registered path converters"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("markdown")
                .long("markdown")
                .action(clap::ArgAction::SetTrue)
                .help("Emit a Markdown table instead of HTML"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, _settings: &Settings) -> PathconvResult<u8> {
        let rows = summaries();
        let table = if matches.get_flag("markdown") {
            markdown_table(&rows)
        } else {
            html_table(&rows)
        };
        println!("{table}");
        Ok(0)
    }
}
