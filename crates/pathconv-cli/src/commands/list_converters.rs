//! The `list_converters` management command.
//!
//! Prints every registered converter with its regex, produced and accepted
//! types and examples, as a text table or as JSON.

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult, Settings};
use pathconv_urls::{registry, ConverterSummary};

use crate::command::ManagementCommand;
use crate::table::text_table;

/// Lists the registered path converters.
pub struct ListConvertersCommand;

/// Summarizes every registration in registration order.
pub fn summaries() -> Vec<ConverterSummary> {
    registry().all().iter().map(|c| c.summary()).collect()
}

/// Renders summaries in `format` (`text` or `json`).
pub fn render(summaries: &[ConverterSummary], format: &str) -> PathconvResult<String> {
    match format {
        "text" => Ok(text_table(summaries)),
        "json" => serde_json::to_string_pretty(summaries)
            .map_err(|e| PathconvError::SerializationError(e.to_string())),
        other => Err(PathconvError::ConfigurationError(format!(
            "Unknown format '{other}'; expected text or json"
        ))),
    }
}

#[async_trait]
impl ManagementCommand for ListConvertersCommand {
    fn name(&self) -> &'static str {
        "list_converters"
    }

    fn help(&self) -> &'static str {
        "List all path converters"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("format")
                .long("format")
                .short('f')
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Output format"),
        )
    }

    async fn handle(&self, matches: &clap::ArgMatches, _settings: &Settings) -> PathconvResult<u8> {
        let format = matches
            .get_one::<String>("format")
            .map_or("text", String::as_str);
        println!("{}", render(&summaries(), format)?);
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summaries_cover_builtins() {
        let all = summaries();
        for name in ["int", "nullbool", "daterange", "week"] {
            assert!(all.iter().any(|s| s.name == name), "missing {name}");
        }
    }

    #[test]
    fn test_render_json() {
        let all = summaries();
        let json = render(&all, "json").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let int = parsed
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == "int")
            .unwrap();
        assert_eq!(int["regex"], "[0-9]+");
        assert!(!int["examples"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_render_unknown_format() {
        assert!(render(&[], "yaml").is_err());
        assert!(render(&[], "text").unwrap().contains("name"));
    }
}
