//! Integration tests for the management commands.
//!
//! Tests cover: parsing the full CLI with a settings file, exit statuses of
//! each built-in command, and replacing `url_overlap` with one bound to an
//! application's URL configuration.

use std::io::Write;
use std::sync::Arc;

use pathconv_cli::command::CommandRegistry;
use pathconv_cli::commands::{register_builtin_commands, UrlOverlapCommand};
use pathconv_core::settings_loader::from_file_with_env;
use pathconv_core::Settings;
use pathconv_urls::urls::pattern::{path, view, ViewFn};
use pathconv_urls::urls::resolver::root;
use pathconv_urls::URLEntry;

fn commands() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    registry
}

async fn run(registry: &CommandRegistry, args: &[&str], settings: &Settings) -> u8 {
    let matches = registry
        .build_cli()
        .try_get_matches_from(std::iter::once("pathconv").chain(args.iter().copied()))
        .unwrap();
    registry.execute(&matches, settings).await.unwrap()
}

fn noop() -> ViewFn {
    view(|_m| async { Ok(String::new()) })
}

#[tokio::test]
async fn test_settings_file_drives_overlap_bound() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[overlap]\nmax_states = 2").unwrap();
    let settings = from_file_with_env(file.path()).unwrap();
    assert_eq!(settings.overlap.max_states, 2);

    let registry = commands();
    let args = ["url_overlap", "--route", "t/<slug:a>/", "--route", "t/<str:b>/"];
    // Undecided pairs do not count towards the exit status.
    assert_eq!(run(&registry, &args, &settings).await, 0);

    let mut wide = args.to_vec();
    wide.extend(["--max-states", "10000"]);
    assert_eq!(run(&registry, &wide, &settings).await, 1);
}

#[tokio::test]
async fn test_listing_commands_succeed() {
    let registry = commands();
    let settings = Settings::default();
    assert_eq!(run(&registry, &["list_converters"], &settings).await, 0);
    assert_eq!(run(&registry, &["list_converters", "--format", "json"], &settings).await, 0);
    assert_eq!(run(&registry, &["converter_table"], &settings).await, 0);
    assert_eq!(run(&registry, &["converter_table", "--markdown"], &settings).await, 0);
    assert!(registry
        .build_cli()
        .try_get_matches_from(["pathconv", "list_converters", "--format", "xml"])
        .is_err());
}

#[tokio::test]
async fn test_check_converters_passes_for_builtins() {
    let registry = commands();
    assert_eq!(run(&registry, &["check_converters"], &Settings::default()).await, 0);
}

#[tokio::test]
async fn test_url_overlap_with_application_urls() {
    let urls = root(vec![
        URLEntry::Pattern(path("<path:rest>/", noop(), Some("rest")).unwrap()),
        URLEntry::Pattern(path("<json:item>/", noop(), Some("json")).unwrap()),
        URLEntry::Pattern(path("static/<int:n>.png", noop(), None).unwrap()),
    ])
    .unwrap();

    let mut registry = commands();
    registry.register(Box::new(UrlOverlapCommand::new().with_url_conf(Arc::new(urls))));

    // rest/json: overlap + shadowed. rest/png and json/png: disjoint, the
    // png route has no trailing slash.
    let status = run(&registry, &["url_overlap"], &Settings::default()).await;
    assert_eq!(status, 2);

    let status = run(
        &registry,
        &["url_overlap", "--regex", "static/[0-9]+\\.png"],
        &Settings::default(),
    )
    .await;
    assert_eq!(status, 4);
}
