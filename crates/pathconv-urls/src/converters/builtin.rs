//! Scalar converters.
//!
//! The first five mirror the converters every django-style router ships with;
//! `bool` and `json` round out the scalar set.

use async_trait::async_trait;
use pathconv_core::{PathconvError, PathconvResult};

use super::{unexpected, ConverterInfo, PathConverter, PathValue, ValueKind};

/// Regex for the 8-4-4-4-12 hex UUID layout.
pub const UUID_REGEX: &str = "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";

/// Converter for integer path segments.
///
/// Matches one or more digits and converts them to `i64`.
#[derive(Debug, Clone)]
pub struct IntConverter {
    info: ConverterInfo,
}

impl Default for IntConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("int", "[0-9]+")
                .examples(["0", "42", "007"])
                .accepts(ValueKind::Int),
        }
    }
}

#[async_trait]
impl PathConverter for IntConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        fragment
            .parse::<i64>()
            .map(PathValue::Int)
            .map_err(|_| PathconvError::BadRequest(format!("Invalid integer value: {fragment}")))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Int(v) if *v >= 0 => Ok(v.to_string()),
            PathValue::Int(v) => Err(PathconvError::BadRequest(format!(
                "IntConverter cannot render negative value {v}"
            ))),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for string path segments (no slashes).
#[derive(Debug, Clone)]
pub struct StrConverter {
    info: ConverterInfo,
}

impl Default for StrConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("str", "[^/]+").examples(["hello", "with space"]),
        }
    }
}

#[async_trait]
impl PathConverter for StrConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        if fragment.is_empty() {
            return Err(PathconvError::BadRequest(
                "String converter requires a non-empty value".to_string(),
            ));
        }
        Ok(PathValue::Str(fragment.to_string()))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Str(v) => Ok(v.clone()),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for slug path segments: ASCII letters, digits, hyphens and
/// underscores.
#[derive(Debug, Clone)]
pub struct SlugConverter {
    info: ConverterInfo,
}

impl Default for SlugConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("slug", "[-a-zA-Z0-9_]+").examples(["hello-world", "a_1"]),
        }
    }
}

#[async_trait]
impl PathConverter for SlugConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        if fragment.is_empty() {
            return Err(PathconvError::BadRequest(
                "Slug converter requires a non-empty value".to_string(),
            ));
        }
        Ok(PathValue::Str(fragment.to_string()))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Str(v) => Ok(v.clone()),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for UUID path segments in lowercase hyphenated form.
#[derive(Debug, Clone)]
pub struct UuidConverter {
    info: ConverterInfo,
}

impl Default for UuidConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("uuid", UUID_REGEX)
                .examples("0f0e5bd2-7c3a-4e57-9a43-2b8a7b0c9d11")
                .accepts(ValueKind::Uuid),
        }
    }
}

#[async_trait]
impl PathConverter for UuidConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        fragment
            .parse::<uuid::Uuid>()
            .map(PathValue::Uuid)
            .map_err(|_| PathconvError::BadRequest(format!("Invalid UUID: {fragment}")))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Uuid(v) => Ok(v.hyphenated().to_string()),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for path segments that may contain slashes.
#[derive(Debug, Clone)]
pub struct PathSegmentConverter {
    info: ConverterInfo,
}

impl Default for PathSegmentConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("path", ".+").examples(["a", "docs/intro/index.html"]),
        }
    }
}

#[async_trait]
impl PathConverter for PathSegmentConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        if fragment.is_empty() {
            return Err(PathconvError::BadRequest(
                "Path converter requires a non-empty value".to_string(),
            ));
        }
        Ok(PathValue::Str(fragment.to_string()))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Str(v) => Ok(v.clone()),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for booleans.
///
/// Accepts `true`/`false`, `yes`/`no`, `on`/`off` and `1`/`0` in any case;
/// renders `true` or `false`.
#[derive(Debug, Clone)]
pub struct BoolConverter {
    info: ConverterInfo,
}

impl Default for BoolConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("bool", "(?i:true|false|yes|no|on|off|1|0)")
                .examples(["true", "False", "yes", "0"])
                .accepts(ValueKind::Bool)
                .pass_str(false),
        }
    }
}

#[async_trait]
impl PathConverter for BoolConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        match fragment.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(PathValue::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(PathValue::Bool(false)),
            _ => Err(PathconvError::BadRequest(format!(
                "Invalid boolean value: {fragment}"
            ))),
        }
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Bool(b) => Ok(b.to_string()),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for a JSON document in a single segment.
///
/// Any JSON value without a `/` is accepted, so views must validate the
/// structure themselves. Renders compact JSON.
#[derive(Debug, Clone)]
pub struct JsonConverter {
    info: ConverterInfo,
}

impl Default for JsonConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("json", "[^/]+")
                .examples(["[1,2,3]", r#"{"id": 5}"#, "true"])
                .accepts(ValueKind::Json)
                .pass_str(false),
        }
    }
}

#[async_trait]
impl PathConverter for JsonConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        serde_json::from_str(fragment)
            .map(PathValue::Json)
            .map_err(|e| PathconvError::BadRequest(format!("Invalid JSON: {e}")))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Json(j) => Ok(serde_json::to_string(j)?),
            other => Err(unexpected(self, other)),
        }
    }
}
