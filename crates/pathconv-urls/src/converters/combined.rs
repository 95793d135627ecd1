//! Combined converters.
//!
//! A [`Combined`] converter joins several named field converters with a
//! literal separator, such as `date` + `/` + `date` for a date range. The
//! public regex contains no capture groups so it can be embedded in routes;
//! parsing uses a private anchored regex with one named group per field.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::utils::{anchored, strip_capture_groups};
use pathconv_core::{PathconvError, PathconvResult};
use regex::Regex;

use super::{unexpected, ConverterInfo, PathConverter, PathValue, ValueKind};

/// Several field converters joined by a separator.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pathconv_urls::converters::builtin::{IntConverter, SlugConverter};
/// use pathconv_urls::converters::combined::Combined;
/// use pathconv_urls::converters::PathConverter;
///
/// let id: Arc<dyn PathConverter> = Arc::new(IntConverter::default());
/// let slug: Arc<dyn PathConverter> = Arc::new(SlugConverter::default());
/// let conv = Combined::new("slugid", "-", vec![("id", id), ("slug", slug)])
/// .unwrap();
/// assert_eq!(conv.regex(), "(?:[0-9]+)\\-(?:[-a-zA-Z0-9_]+)");
/// ```
#[derive(Debug)]
pub struct Combined {
    info: ConverterInfo,
    separator: String,
    fields: Vec<(String, Arc<dyn PathConverter>)>,
    internal: Regex,
}

impl Combined {
    /// Builds a combined converter named `name`.
    ///
    /// Default examples pair up the fields' own examples position by
    /// position.
    ///
    /// # Errors
    ///
    /// [`PathconvError::ImproperlyConfigured`] when there are no fields, a
    /// field name is not a valid group name or is repeated, or the combined
    /// regex does not compile.
    pub fn new(
        name: &str,
        separator: &str,
        fields: Vec<(&str, Arc<dyn PathConverter>)>,
    ) -> PathconvResult<Self> {
        if fields.is_empty() {
            return Err(PathconvError::ImproperlyConfigured(format!(
                "Combined converter '{name}' needs at least one field"
            )));
        }

        let sep = regex::escape(separator);
        let mut public = String::new();
        let mut internal = String::new();
        let mut seen: Vec<&str> = Vec::new();

        for (i, (field, conv)) in fields.iter().enumerate() {
            if !is_group_name(field) || seen.contains(field) {
                return Err(PathconvError::ImproperlyConfigured(format!(
                    "Combined converter '{name}' has invalid or repeated field name '{field}'"
                )));
            }
            seen.push(field);

            let inner = strip_capture_groups(conv.regex());
            if i > 0 {
                public.push_str(&sep);
                internal.push_str(&sep);
            }
            write!(public, "(?:{inner})").ok();
            write!(internal, "(?P<{field}>{inner})").ok();
        }

        let internal = Regex::new(&anchored(&internal)).map_err(|e| {
            PathconvError::ImproperlyConfigured(format!(
                "Combined converter '{name}' has an invalid regex: {e}"
            ))
        })?;

        let examples = default_examples(&fields, separator);
        let info = ConverterInfo::new(name, public)
            .owned_examples(examples)
            .accepts(ValueKind::Tuple);

        Ok(Self {
            info,
            separator: separator.to_string(),
            fields: fields
                .into_iter()
                .map(|(n, c)| (n.to_string(), c))
                .collect(),
            internal,
        })
    }

    /// Replaces the declared examples.
    #[must_use]
    pub fn with_examples<'a>(
        mut self,
        examples: impl Into<pathconv_core::utils::OneOrMany<&'a str>>,
    ) -> Self {
        self.info = self.info.examples(examples);
        self
    }

    /// Returns the separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns the field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns the anchored regex with one named group per field.
    pub fn internal_regex(&self) -> &str {
        self.internal.as_str()
    }
}

fn is_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_examples(fields: &[(&str, Arc<dyn PathConverter>)], separator: &str) -> Vec<String> {
    let count = fields
        .iter()
        .map(|(_, c)| c.examples().len())
        .min()
        .unwrap_or(0);
    (0..count)
        .map(|i| {
            fields
                .iter()
                .map(|(_, c)| c.examples()[i].as_str())
                .collect::<Vec<_>>()
                .join(separator)
        })
        .collect()
}

#[async_trait]
impl PathConverter for Combined {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        let caps = self.internal.captures(fragment).ok_or_else(|| {
            PathconvError::BadRequest(format!(
                "'{fragment}' does not match converter '{}'",
                self.name()
            ))
        })?;

        let mut values = Vec::with_capacity(self.fields.len());
        for (name, conv) in &self.fields {
            let raw = caps.name(name).map_or("", |m| m.as_str());
            values.push((name.clone(), conv.to_value(raw).await?));
        }
        Ok(PathValue::Tuple(values))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        let PathValue::Tuple(values) = value else {
            return Err(unexpected(self, value));
        };
        if values.len() != self.fields.len() {
            return Err(PathconvError::BadRequest(format!(
                "Converter '{}' expects {} fields, got {}",
                self.name(),
                self.fields.len(),
                values.len()
            )));
        }

        let mut parts = Vec::with_capacity(self.fields.len());
        for (i, (name, conv)) in self.fields.iter().enumerate() {
            let field = value.field(name).unwrap_or(&values[i].1);
            parts.push(conv.to_url(field)?);
        }
        Ok(parts.join(&self.separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::builtin::{IntConverter, SlugConverter};

    fn slug_id() -> Combined {
        Combined::new(
            "slugid",
            "-",
            vec![
                ("id", Arc::new(IntConverter::default()) as Arc<dyn PathConverter>),
                ("slug", Arc::new(SlugConverter::default()) as Arc<dyn PathConverter>),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_public_regex_has_no_groups() {
        let conv = slug_id();
        let re = Regex::new(conv.regex()).unwrap();
        assert_eq!(re.captures_len(), 1);
        assert_eq!(conv.field_names(), vec!["id", "slug"]);
        assert!(conv.internal_regex().contains("(?P<id>"));
    }

    #[tokio::test]
    async fn test_parse_in_declared_order() {
        let conv = slug_id();
        let value = conv.to_value("12-hello-world").await.unwrap();
        assert_eq!(
            value,
            PathValue::Tuple(vec![
                ("id".into(), PathValue::Int(12)),
                ("slug".into(), PathValue::Str("hello-world".into())),
            ])
        );
        assert!(conv.to_value("x-hello").await.is_err());
    }

    #[test]
    fn test_render_by_name_then_position() {
        let conv = slug_id();
        let by_name = PathValue::Tuple(vec![
            ("slug".into(), PathValue::Str("s".into())),
            ("id".into(), PathValue::Int(3)),
        ]);
        assert_eq!(conv.to_url(&by_name).unwrap(), "3-s");

        let by_position = PathValue::Tuple(vec![
            (String::new(), PathValue::Int(4)),
            (String::new(), PathValue::Str("t".into())),
        ]);
        assert_eq!(conv.to_url(&by_position).unwrap(), "4-t");

        assert!(conv.to_url(&PathValue::Tuple(vec![])).is_err());
        assert!(conv.to_url(&PathValue::Int(1)).is_err());
    }

    #[test]
    fn test_default_examples_pair_up() {
        let conv = slug_id();
        assert_eq!(conv.examples(), ["0-hello-world", "42-a_1"]);
    }

    #[test]
    fn test_invalid_field_names() {
        let int = || Arc::new(IntConverter::default()) as Arc<dyn PathConverter>;
        assert!(Combined::new("c", "/", vec![]).is_err());
        assert!(Combined::new("c", "/", vec![("1a", int())]).is_err());
        assert!(Combined::new("c", "/", vec![("a", int()), ("a", int())]).is_err());
    }
}
