//! The `check_converters` management command.
//!
//! Runs the round-trip self-test over every example of every registered
//! converter and reports the failures. The exit status is the number of
//! failures, capped at 255.

use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult, Settings};
use pathconv_urls::converters::registry::check_converters;
use pathconv_urls::{registry, PathConverter};

use crate::command::ManagementCommand;

/// Self-tests the registered converters.
pub struct CheckConvertersCommand;

/// The outcome of a self-test run.
#[derive(Debug, Default)]
pub struct CheckSummary {
    /// Converters checked.
    pub converters: usize,
    /// Examples checked.
    pub examples: usize,
    /// Every failure, in registration order.
    pub failures: Vec<PathconvError>,
}

impl CheckSummary {
    /// Returns the failure count capped at 255.
    pub fn exit_status(&self) -> u8 {
        u8::try_from(self.failures.len()).unwrap_or(u8::MAX)
    }
}

/// Self-tests `converters`, or the global registry when `None`.
pub async fn run(converters: Option<Vec<Arc<dyn PathConverter>>>) -> CheckSummary {
    let converters = converters.unwrap_or_else(|| registry().all().to_vec());
    let examples = converters.iter().map(|c| c.examples().len()).sum();
    let failures = check_converters(&converters).await;
    CheckSummary {
        converters: converters.len(),
        examples,
        failures,
    }
}

#[async_trait]
impl ManagementCommand for CheckConvertersCommand {
    fn name(&self) -> &'static str {
        "check_converters"
    }

    fn help(&self) -> &'static str {
        "Check that every converter example round-trips"
    }

    async fn handle(&self, _matches: &clap::ArgMatches, _settings: &Settings) -> PathconvResult<u8> {
        let summary = run(None).await;
        for failure in &summary.failures {
            println!("FAIL {failure}");
        }
        println!(
            "Checked {} examples of {} converters: {} failed.",
            summary.examples,
            summary.converters,
            summary.failures.len()
        );
        Ok(summary.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathconv_urls::converters::builtin::IntConverter;
    use pathconv_urls::converters::combined::Combined;

    #[tokio::test]
    async fn test_builtins_pass() {
        let summary = run(None).await;
        assert!(summary.converters >= 15);
        assert!(summary.examples > summary.converters);
        assert!(summary.failures.is_empty(), "{:?}", summary.failures);
        assert_eq!(summary.exit_status(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let id: Arc<dyn PathConverter> = Arc::new(IntConverter::default());
        let bad = Combined::new("ids", "-", vec![("id", id)])
            .unwrap()
            .with_examples(["x", "y", "1"]);
        let bad: Arc<dyn PathConverter> = Arc::new(bad);
        let summary = run(Some(vec![bad])).await;
        assert_eq!(summary.examples, 3);
        assert_eq!(summary.exit_status(), 2);
        assert!(matches!(
            summary.failures[0],
            PathconvError::ConverterCheckFailed { .. }
        ));
    }
}
