//! The converter registry.
//!
//! Route parsing looks converters up by name in the registry's table. Every
//! registration is also appended to an ordered list that the introspection
//! commands walk, so a converter replaced under its name is still audited.
//!
//! A registration only succeeds when the converter regex compiles. With
//! `check_examples` enabled, [`ConverterRegistry::register_checked`] also runs
//! the round-trip self-test on every declared example.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use pathconv_core::utils::anchored;
use pathconv_core::{ConverterSettings, PathconvError, PathconvResult, SETTINGS};
use pathconv_db::{Databases, ModelRegistry};
use regex::Regex;

use super::builtin::{
    BoolConverter, IntConverter, JsonConverter, PathSegmentConverter, SlugConverter,
    StrConverter, UuidConverter,
};
use super::dates::{date_range, DateConverter, MonthConverter, WeekConverter};
use super::nullable::Nullable;
use super::objects::{Loading, ModelConverter, ObjectConverter};
use super::PathConverter;

/// Compiles the anchored form of a converter's regex.
///
/// # Errors
///
/// [`PathconvError::ImproperlyConfigured`] when the regex is invalid.
pub fn compile(converter: &dyn PathConverter) -> PathconvResult<Regex> {
    Regex::new(&anchored(converter.regex())).map_err(|e| {
        PathconvError::ImproperlyConfigured(format!(
            "Converter '{}' has an invalid regex '{}': {e}",
            converter.name(),
            converter.regex()
        ))
    })
}

/// Runs the round-trip self-test for one example.
///
/// The example must match `pattern`, convert to a value of a declared kind,
/// render to a fragment that matches `pattern` and converts back to an equal
/// value, and render the same fragment a second time.
///
/// # Errors
///
/// [`PathconvError::ConverterCheckFailed`] naming the failed step.
pub async fn verify_example(
    converter: &dyn PathConverter,
    pattern: &Regex,
    example: &str,
) -> PathconvResult<()> {
    let fail = |reason: String| PathconvError::ConverterCheckFailed {
        converter: converter.name(),
        example: example.to_string(),
        reason,
    };

    if !pattern.is_match(example) {
        return Err(fail(format!("does not match regex '{}'", converter.regex())));
    }

    let first = converter
        .to_value(example)
        .await
        .map_err(|e| fail(format!("to_value failed: {e}")))?;
    if !converter.accepts().iter().any(|k| k.matches(&first)) {
        return Err(fail(format!(
            "produced {}, expected one of {:?}",
            super::ValueKind::of(&first),
            converter
                .accepts()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        )));
    }

    let fragment = converter
        .to_url(&first)
        .map_err(|e| fail(format!("to_url failed: {e}")))?;
    if !pattern.is_match(&fragment) {
        return Err(fail(format!("rendered '{fragment}' does not match the regex")));
    }

    let second = converter
        .to_value(&fragment)
        .await
        .map_err(|e| fail(format!("to_value of '{fragment}' failed: {e}")))?;
    if second != first {
        return Err(fail(format!("'{fragment}' parsed to {second}, expected {first}")));
    }

    let again = converter
        .to_url(&second)
        .map_err(|e| fail(format!("second to_url failed: {e}")))?;
    if again != fragment {
        return Err(fail(format!("rendered '{again}' after '{fragment}'")));
    }
    Ok(())
}

/// Runs [`verify_example`] on every declared example, stopping at the first
/// failure.
pub async fn verify_examples(converter: &dyn PathConverter) -> PathconvResult<()> {
    let pattern = compile(converter)?;
    for example in converter.examples() {
        verify_example(converter, &pattern, example).await?;
    }
    tracing::debug!(
        converter = %converter.name(),
        examples = converter.examples().len(),
        "converter examples verified"
    );
    Ok(())
}

/// Name-indexed converters plus the ordered list of every registration.
#[derive(Debug, Default)]
pub struct ConverterRegistry {
    settings: ConverterSettings,
    table: HashMap<String, Arc<dyn PathConverter>>,
    entries: Vec<Arc<dyn PathConverter>>,
}

impl ConverterRegistry {
    /// Creates an empty registry.
    pub fn new(settings: ConverterSettings) -> Self {
        Self {
            settings,
            table: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Creates a registry holding the scalar, date and nullable converters.
    ///
    /// Their examples are not run; use [`checked_builtins`](Self::checked_builtins)
    /// or [`verify`](Self::verify) for that.
    pub fn with_builtins(settings: ConverterSettings) -> PathconvResult<Self> {
        let mut registry = Self::new(settings);
        let token = registry.settings.null_token.clone();

        let int: Arc<dyn PathConverter> = Arc::new(IntConverter::default());
        let uuid: Arc<dyn PathConverter> = Arc::new(UuidConverter::default());
        let boolean: Arc<dyn PathConverter> = Arc::new(BoolConverter::default());
        let date: Arc<dyn PathConverter> = Arc::new(DateConverter::default());

        let builtins: Vec<Arc<dyn PathConverter>> = vec![
            Arc::clone(&int),
            Arc::new(StrConverter::default()),
            Arc::new(SlugConverter::default()),
            Arc::clone(&uuid),
            Arc::new(PathSegmentConverter::default()),
            Arc::clone(&boolean),
            Arc::new(JsonConverter::default()),
            Arc::clone(&date),
            Arc::new(MonthConverter::default()),
            Arc::new(WeekConverter::default()),
            Arc::new(date_range()?),
            Arc::new(Nullable::with_token(boolean, &token)),
            Arc::new(Nullable::with_token(int, &token)),
            Arc::new(Nullable::with_token(date, &token)),
            Arc::new(Nullable::with_token(uuid, &token)),
        ];
        for converter in builtins {
            registry.register(converter)?;
        }
        Ok(registry)
    }

    /// Creates a registry holding the built-ins and, when `check_examples`
    /// is enabled, runs their examples.
    pub async fn checked_builtins(settings: ConverterSettings) -> PathconvResult<Self> {
        let registry = Self::with_builtins(settings)?;
        registry.verify().await?;
        Ok(registry)
    }

    /// Registers the `model` and `object` converters over `models`, loading
    /// objects lazily with the configured probe. Both go through
    /// [`register_checked`](Self::register_checked).
    pub async fn register_models(
        &mut self,
        models: Arc<ModelRegistry>,
        databases: Arc<Databases>,
    ) -> PathconvResult<&mut Self> {
        let loading = Loading::from_settings(&self.settings);
        self.register_checked(Arc::new(ModelConverter::new(Arc::clone(&models))))
            .await?;
        self.register_checked(Arc::new(ObjectConverter::new(models, databases, loading)))
            .await?;
        Ok(self)
    }

    /// Returns the settings the registry was built with.
    pub const fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    /// Registers a converter without running its examples. Returns the
    /// registration name.
    ///
    /// A converter registered under a taken name replaces the previous one
    /// for route parsing; both stay in [`all`](Self::all).
    pub fn register(&mut self, converter: Arc<dyn PathConverter>) -> PathconvResult<String> {
        compile(converter.as_ref())?;
        let name = converter.name();

        if self.table.contains_key(&name) {
            tracing::warn!(converter = %name, "converter registered twice, replacing");
        } else {
            tracing::debug!(converter = %name, regex = %converter.regex(), "registered converter");
        }
        self.table.insert(name.clone(), Arc::clone(&converter));
        self.entries.push(converter);
        Ok(name)
    }

    /// Registers a converter, first running its examples when
    /// `check_examples` is enabled.
    pub async fn register_checked(
        &mut self,
        converter: Arc<dyn PathConverter>,
    ) -> PathconvResult<String> {
        if self.settings.check_examples {
            verify_examples(converter.as_ref()).await?;
        }
        self.register(converter)
    }

    /// Looks a converter up by name.
    ///
    /// # Errors
    ///
    /// [`PathconvError::ImproperlyConfigured`] for unknown names.
    pub fn get(&self, name: &str) -> PathconvResult<Arc<dyn PathConverter>> {
        self.table.get(name).cloned().ok_or_else(|| {
            PathconvError::ImproperlyConfigured(format!("Unknown path converter type: {name}"))
        })
    }

    /// Returns `true` if a converter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Returns every registration in order, replaced ones included.
    pub fn all(&self) -> &[Arc<dyn PathConverter>] {
        &self.entries
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the self-test over every example of every registration and
    /// returns all failures.
    pub async fn check_all(&self) -> Vec<PathconvError> {
        check_converters(&self.entries).await
    }

    /// Runs the self-test when `check_examples` is enabled.
    ///
    /// # Errors
    ///
    /// The first failure, after every failure has been logged.
    pub async fn verify(&self) -> PathconvResult<()> {
        if !self.settings.check_examples {
            return Ok(());
        }
        first_failure(self.check_all().await)
    }
}

/// Runs the self-test over every example of `converters` and returns all
/// failures.
///
/// Clone the handles out of the global registry before calling this; its
/// guard must not be held across an await.
pub async fn check_converters(converters: &[Arc<dyn PathConverter>]) -> Vec<PathconvError> {
    let mut failures = Vec::new();
    for converter in converters {
        let pattern = match compile(converter.as_ref()) {
            Ok(p) => p,
            Err(e) => {
                failures.push(e);
                continue;
            }
        };
        for example in converter.examples() {
            if let Err(e) = verify_example(converter.as_ref(), &pattern, example).await {
                tracing::warn!(error = %e, "converter example failed");
                failures.push(e);
            }
        }
    }
    failures
}

fn first_failure(failures: Vec<PathconvError>) -> PathconvResult<()> {
    failures.into_iter().next().map_or(Ok(()), Err)
}

static REGISTRY: Lazy<RwLock<ConverterRegistry>> = Lazy::new(|| {
    let settings = SETTINGS
        .try_get()
        .map(|s| s.converters.clone())
        .unwrap_or_default();
    let registry = ConverterRegistry::with_builtins(settings.clone()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to register built-in converters");
        ConverterRegistry::new(settings)
    });
    RwLock::new(registry)
});

/// Returns a read handle to the global registry.
pub fn registry() -> RwLockReadGuard<'static, ConverterRegistry> {
    REGISTRY.read().unwrap_or_else(PoisonError::into_inner)
}

/// Returns a write handle to the global registry.
pub fn registry_mut() -> RwLockWriteGuard<'static, ConverterRegistry> {
    REGISTRY.write().unwrap_or_else(PoisonError::into_inner)
}

static SEED_CHECK: tokio::sync::OnceCell<()> = tokio::sync::OnceCell::const_new();

/// Runs the examples of the converters the global registry was seeded with,
/// once per process, when `check_examples` is enabled.
///
/// [`register_converter`] calls this before its first registration.
///
/// # Errors
///
/// The first failing example; the check is retried on the next call.
pub async fn verify_registry() -> PathconvResult<()> {
    SEED_CHECK
        .get_or_try_init(|| async {
            let (check, seeded) = {
                let registry = registry();
                (registry.settings().check_examples, registry.all().to_vec())
            };
            if check {
                first_failure(check_converters(&seeded).await)?;
                tracing::debug!(converters = seeded.len(), "seeded converters verified");
            }
            Ok::<(), PathconvError>(())
        })
        .await?;
    Ok(())
}

/// Registers a converter in the global registry, running its examples first
/// when `check_examples` is enabled.
pub async fn register_converter(converter: Arc<dyn PathConverter>) -> PathconvResult<String> {
    verify_registry().await?;
    let check = registry().settings().check_examples;
    if check {
        verify_examples(converter.as_ref()).await?;
    }
    registry_mut().register(converter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::{ConverterInfo, PathValue};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Broken {
        info: ConverterInfo,
    }

    #[async_trait]
    impl PathConverter for Broken {
        fn info(&self) -> &ConverterInfo {
            &self.info
        }

        async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
            Ok(PathValue::Str(format!("{fragment}x")))
        }

        fn render(&self, value: &PathValue) -> PathconvResult<String> {
            Ok(value.to_string())
        }
    }

    fn broken(name: &str, regex: &str, example: &str) -> Arc<dyn PathConverter> {
        Arc::new(Broken {
            info: ConverterInfo::new(name, regex).examples(example),
        })
    }

    #[tokio::test]
    async fn test_builtin_examples_round_trip() {
        let registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
        let failures = registry.check_all().await;
        assert!(failures.is_empty(), "{failures:?}");
    }

    #[test]
    fn test_builtin_names() {
        let registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
        for name in [
            "int", "str", "slug", "uuid", "path", "bool", "json", "date", "month", "week",
            "daterange", "nullbool", "nullint", "nulldate", "nulluuid",
        ] {
            assert!(registry.contains(name), "{name}");
        }
        assert_eq!(registry.all().len(), 15);
    }

    #[test]
    fn test_invalid_regex_never_registers() {
        let mut registry = ConverterRegistry::default();
        let err = registry.register(broken("bad", "(", "x")).unwrap_err();
        assert!(matches!(err, PathconvError::ImproperlyConfigured(_)));
        assert!(!registry.contains("bad"));
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_duplicate_replaces_but_stays_listed() {
        let mut registry = ConverterRegistry::default();
        registry.register(broken("dup", "a", "a")).unwrap();
        registry.register(broken("dup", "b", "b")).unwrap();
        assert_eq!(registry.get("dup").unwrap().regex(), "b");
        assert_eq!(registry.all().len(), 2);
        assert_eq!(registry.names(), vec!["dup"]);
    }

    #[test]
    fn test_unknown_name() {
        let registry = ConverterRegistry::default();
        assert!(matches!(
            registry.get("nope"),
            Err(PathconvError::ImproperlyConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_register_checked_rejects_failing_example() {
        let mut registry = ConverterRegistry::new(ConverterSettings::default());
        let err = registry
            .register_checked(broken("drift", "[a-z]+", "abc"))
            .await
            .unwrap_err();
        assert!(matches!(err, PathconvError::ConverterCheckFailed { .. }));
        assert!(!registry.contains("drift"));

        let err = registry
            .register_checked(broken("nomatch", "[0-9]+", "abc"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not match regex"));
    }

    #[tokio::test]
    async fn test_register_checked_skips_when_disabled() {
        let settings = ConverterSettings {
            check_examples: false,
            ..ConverterSettings::default()
        };
        let mut registry = ConverterRegistry::new(settings);
        let name = registry
            .register_checked(broken("drift", "[a-z]+", "abc"))
            .await
            .unwrap();
        assert_eq!(name, "drift");
    }

    #[tokio::test]
    async fn test_check_all_reports_every_failure() {
        let mut registry = ConverterRegistry::default();
        registry.register(broken("a", "[a-z]+", "abc")).unwrap();
        registry.register(broken("b", "[a-z]+", "xyz")).unwrap();
        assert_eq!(registry.check_all().await.len(), 2);
    }

    #[test]
    fn test_global_registry_is_seeded() {
        assert!(registry().contains("date"));
    }

    #[tokio::test]
    async fn test_global_seed_is_verified() {
        verify_registry().await.unwrap();
        assert!(SEED_CHECK.initialized());
    }

    #[tokio::test]
    async fn test_checked_builtins() {
        let registry = ConverterRegistry::checked_builtins(ConverterSettings::default())
            .await
            .unwrap();
        assert_eq!(registry.all().len(), 15);
    }

    #[tokio::test]
    async fn test_verify_runs_seeded_examples() {
        let mut registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
        registry.register(broken("drift", "[a-z]+", "abc")).unwrap();
        let err = registry.verify().await.unwrap_err();
        assert!(matches!(err, PathconvError::ConverterCheckFailed { ref converter, .. } if converter == "drift"));

        let settings = ConverterSettings {
            check_examples: false,
            ..ConverterSettings::default()
        };
        let mut registry = ConverterRegistry::with_builtins(settings).unwrap();
        registry.register(broken("drift", "[a-z]+", "abc")).unwrap();
        assert!(registry.verify().await.is_ok());
    }
}
