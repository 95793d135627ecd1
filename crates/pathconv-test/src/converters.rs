//! Converter example assertions.
//!
//! Wraps the registry's round-trip self-test in panicking assertions so a
//! test names the converter, example and failed step.

use pathconv_urls::converters::registry::{check_converters, compile, verify_example};
use pathconv_urls::{ConverterRegistry, PathConverter};

/// Asserts that `example` survives the round trip through `converter`.
///
/// # Panics
///
/// Panics if the converter regex is invalid or any round-trip step fails.
pub async fn assert_valid_converter_example(converter: &dyn PathConverter, example: &str) {
    let pattern = match compile(converter) {
        Ok(pattern) => pattern,
        Err(e) => panic!("{e}"),
    };
    if let Err(e) = verify_example(converter, &pattern, example).await {
        panic!("{e}");
    }
}

/// Asserts that every example of every registration in `registry` is valid.
///
/// # Panics
///
/// Panics listing all failures.
pub async fn assert_all_examples_valid(registry: &ConverterRegistry) {
    let failures = check_converters(registry.all()).await;
    assert!(
        failures.is_empty(),
        "{} converter example(s) failed:\n{}",
        failures.len(),
        failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{converter_registry, seeded_databases};
    use pathconv_core::ConverterSettings;
    use pathconv_urls::converters::builtin::IntConverter;

    #[tokio::test]
    async fn test_int_examples() {
        let int = IntConverter::default();
        assert_valid_converter_example(&int, "42").await;
        assert_valid_converter_example(&int, "007").await;
    }

    #[tokio::test]
    #[should_panic(expected = "does not match regex")]
    async fn test_non_matching_example_panics() {
        assert_valid_converter_example(&IntConverter::default(), "forty-two").await;
    }

    #[tokio::test]
    async fn test_fixture_registry_examples() {
        let (_, _, databases) = seeded_databases();
        let registry = converter_registry(ConverterSettings::default(), databases).await;
        assert_all_examples_valid(&registry).await;
    }
}
