//! Integration tests for converter-driven routing.
//!
//! Tests cover: every built-in example resolving through a route and
//! reversing back, custom converters registered in the global registry,
//! combined converters inside nested resolvers, and dispatch through view
//! middleware.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;

use pathconv_core::{ConverterSettings, PathconvError, PathconvResult};
use pathconv_urls::converters::builtin::{IntConverter, SlugConverter};
use pathconv_urls::converters::combined::Combined;
use pathconv_urls::converters::registry::{register_converter, registry, ConverterRegistry};
use pathconv_urls::converters::{PathConverter, PathValue};
use pathconv_urls::middleware::ViewMiddleware;
use pathconv_urls::urls::pattern::{path, path_with, view, ViewFn};
use pathconv_urls::urls::resolver::{include_with, root, URLEntry};
use pathconv_urls::urls::reverse::reverse;
use pathconv_urls::{Dispatcher, ResolverMatch};

fn echo() -> ViewFn {
    view(|m| async move { Ok(m.kwargs.get("x").map(ToString::to_string).unwrap_or_default()) })
}

fn builtins() -> ConverterRegistry {
    ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap()
}

// ── Built-ins through routes ────────────────────────────────────────

#[tokio::test]
async fn test_every_builtin_example_resolves_and_reverses() {
    let reg = builtins();
    for name in reg.names() {
        let converter = reg.get(name).unwrap();
        let urls = root(vec![URLEntry::Pattern(
            path_with(&reg, &format!("t/<{name}:x>/"), echo(), Some("t")).unwrap(),
        )])
        .unwrap();

        for example in converter.examples() {
            let m = urls
                .resolve(&format!("t/{example}/"))
                .await
                .unwrap_or_else(|e| panic!("{name} failed to resolve '{example}': {e}"));
            let value = m.kwargs["x"].clone();

            let kwargs = HashMap::from([("x", value.clone())]);
            let url = reverse("t", &kwargs, &urls).unwrap();
            let decoded = percent_decode_str(&url).decode_utf8().unwrap();
            assert_eq!(decoded, format!("/t/{}/", converter.to_url(&value).unwrap()));

            let again = urls.resolve(decoded.trim_start_matches('/')).await.unwrap();
            assert_eq!(again.kwargs["x"], value, "{name} example '{example}'");
        }
    }
}

// ── Global registry ─────────────────────────────────────────────────

#[tokio::test]
async fn test_custom_converter_in_global_registry() {
    let id: Arc<dyn PathConverter> = Arc::new(IntConverter::default());
    let slug: Arc<dyn PathConverter> = Arc::new(SlugConverter::default());
    let combined = Combined::new("test_idslug", "-", vec![("id", id), ("slug", slug)]).unwrap();

    let name = register_converter(Arc::new(combined)).await.unwrap();
    assert_eq!(name, "test_idslug");
    assert!(registry().contains("test_idslug"));

    let urls = root(vec![URLEntry::Pattern(
        path("post/<test_idslug:x>/", echo(), Some("post")).unwrap(),
    )])
    .unwrap();
    let m = urls.resolve("post/12-hello/").await.unwrap();
    assert_eq!(m.kwargs["x"].field("id"), Some(&PathValue::Int(12)));
    assert_eq!(m.call().await.unwrap(), "(12, hello)");
}

#[tokio::test]
async fn test_failing_examples_never_reach_global_registry() {
    let bad = Combined::new(
        "test_bad_examples",
        "-",
        vec![("id", Arc::new(IntConverter::default()) as Arc<dyn PathConverter>)],
    )
    .unwrap()
    .with_examples("not-a-number");

    let err = register_converter(Arc::new(bad)).await.unwrap_err();
    assert!(matches!(err, PathconvError::ConverterCheckFailed { .. }));
    assert!(!registry().contains("test_bad_examples"));
}

// ── Nested resolvers ────────────────────────────────────────────────

#[tokio::test]
async fn test_daterange_inside_include() {
    let reg = builtins();
    let reports = include_with(
        &reg,
        "reports/<slug:team>/",
        vec![URLEntry::Pattern(
            path_with(&reg, "<daterange:x>/", echo(), Some("range")).unwrap(),
        )],
        Some("reports"),
        None,
    )
    .unwrap();
    let urls = root(vec![URLEntry::Resolver(reports)]).unwrap();

    let m = urls.resolve("reports/core/1958-3-25/2019-11-25/").await.unwrap();
    assert_eq!(m.kwargs["team"], PathValue::Str("core".into()));
    assert_eq!(m.call().await.unwrap(), "(1958-03-25, 2019-11-25)");

    let m = urls.resolve("reports/core/1958-3-25/2019-11-25/").await.unwrap();
    let kwargs: HashMap<&str, PathValue> = m
        .kwargs
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    assert_eq!(
        reverse("reports:range", &kwargs, &urls).unwrap(),
        "/reports/core/1958-03-25/2019-11-25/"
    );
}

// ── Dispatch ────────────────────────────────────────────────────────

struct CountingMiddleware(Arc<AtomicUsize>);

#[async_trait]
impl ViewMiddleware for CountingMiddleware {
    async fn process_view(&self, m: &mut ResolverMatch) -> PathconvResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        m.kwargs.insert("x".to_string(), PathValue::Str("rewritten".into()));
        Ok(())
    }
}

#[tokio::test]
async fn test_middleware_runs_before_view() {
    let reg = builtins();
    let urls = root(vec![URLEntry::Pattern(
        path_with(&reg, "n/<int:x>/", echo(), None).unwrap(),
    )])
    .unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::new(urls).middleware(CountingMiddleware(Arc::clone(&count)));

    assert_eq!(dispatcher.dispatch("/n/1/").await.unwrap(), "rewritten");
    assert!(dispatcher.dispatch("/n/x/").await.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
