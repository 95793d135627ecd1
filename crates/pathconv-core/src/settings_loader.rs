//! Settings loading from configuration files.
//!
//! Settings are loaded in three layers:
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `PATHCONV_DEBUG` | `debug` |
//! | `PATHCONV_LOG_LEVEL` | `log_level` |
//! | `PATHCONV_CHECK_EXAMPLES` | `converters.check_examples` |
//! | `PATHCONV_NULL_TOKEN` | `converters.null_token` |
//! | `PATHCONV_LAZY_PROBE` | `converters.lazy_probe` |
//! | `PATHCONV_OVERLAP_MAX_STATES` | `overlap.max_states` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use pathconv_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file("config/pathconv.toml").unwrap();
//! let settings = settings_loader::from_json_file_with_env("config/pathconv.json").unwrap();
//! ```

use std::path::Path;

use crate::error::{PathconvError, PathconvResult};
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any settings missing from the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> PathconvResult<Settings> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| PathconvError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> PathconvResult<Settings> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> PathconvResult<Settings> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> PathconvResult<Settings> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| PathconvError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> PathconvResult<Settings> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from a JSON file and then applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> PathconvResult<Settings> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a file, picking the format from its extension.
///
/// `.json` files are read as JSON, everything else as TOML. Environment
/// overrides are applied afterwards.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn from_file_with_env(path: impl AsRef<Path>) -> PathconvResult<Settings> {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext == "json") {
        from_json_file_with_env(path)
    } else {
        from_toml_file_with_env(path)
    }
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `PATHCONV_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Applies overrides read through `lookup`, using the `PATHCONV_*` names.
///
/// Unparseable values are ignored and leave the setting unchanged.
pub fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("PATHCONV_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Some(val) = lookup("PATHCONV_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("PATHCONV_CHECK_EXAMPLES") {
        settings.converters.check_examples = parse_flag(&val);
    }

    if let Some(val) = lookup("PATHCONV_NULL_TOKEN") {
        settings.converters.null_token = val;
    }

    if let Some(val) = lookup("PATHCONV_LAZY_PROBE") {
        match val.parse() {
            Ok(mode) => settings.converters.lazy_probe = mode,
            Err(e) => tracing::warn!("Ignoring PATHCONV_LAZY_PROBE: {e}"),
        }
    }

    if let Some(val) = lookup("PATHCONV_OVERLAP_MAX_STATES") {
        if let Ok(max_states) = val.parse::<usize>() {
            settings.overlap.max_states = max_states;
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_config(path: &Path, format: &str) -> PathconvResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        PathconvError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, format: &str) -> PathconvResult<Settings> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        PathconvError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        PathconvError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
