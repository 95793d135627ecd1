//! Nullable converters.
//!
//! [`Nullable`] wraps another converter so the segment may also be empty or
//! spell `null`/`none` in any case, all of which parse to
//! [`PathValue::Null`]. The wrapped name gains a `null` prefix.

use std::sync::Arc;

use async_trait::async_trait;
use pathconv_core::utils::strip_capture_groups;
use pathconv_core::PathconvResult;

use super::{ConverterInfo, PathConverter, PathValue, ValueKind};

/// The token rendered for [`PathValue::Null`] unless configured otherwise.
pub const DEFAULT_NULL_TOKEN: &str = "null";

/// A converter that also accepts the absent value.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::sync::Arc;
/// use pathconv_urls::converters::builtin::BoolConverter;
/// use pathconv_urls::converters::nullable::Nullable;
/// use pathconv_urls::converters::{PathConverter, PathValue};
///
/// let conv = Nullable::new(Arc::new(BoolConverter::default()));
/// assert_eq!(conv.name(), "nullbool");
/// assert_eq!(conv.to_value("").await.unwrap(), PathValue::Null);
/// assert_eq!(conv.to_url(&PathValue::Null).unwrap(), "null");
/// # }
/// ```
#[derive(Debug)]
pub struct Nullable {
    info: ConverterInfo,
    inner: Arc<dyn PathConverter>,
    null_token: String,
}

impl Nullable {
    /// Wraps `inner`, rendering nulls as `null`.
    pub fn new(inner: Arc<dyn PathConverter>) -> Self {
        Self::with_token(inner, DEFAULT_NULL_TOKEN)
    }

    /// Wraps `inner`, rendering nulls as `null_token`.
    ///
    /// The token must itself parse as null (empty, `null` or `none`), or the
    /// converter fails its own round-trip check.
    pub fn with_token(inner: Arc<dyn PathConverter>, null_token: &str) -> Self {
        let base = inner.info();
        let regex = format!(
            "(?:(?i:null|none)|{})?",
            strip_capture_groups(inner.regex())
        );

        let mut examples = inner.examples().to_vec();
        examples.push(String::new());
        examples.push("NULL".to_string());

        let mut accepts = inner.accepts().to_vec();
        accepts.push(ValueKind::Null);

        let info = ConverterInfo::new(String::new(), regex)
            .named(base.name.clone().with_prefix("null"))
            .owned_examples(examples)
            .accepts(accepts)
            .pass_str(base.pass_str);

        Self {
            info,
            inner,
            null_token: null_token.to_string(),
        }
    }

    /// Returns the wrapped converter.
    pub fn inner(&self) -> &Arc<dyn PathConverter> {
        &self.inner
    }

    /// Returns the token rendered for the absent value.
    pub fn null_token(&self) -> &str {
        &self.null_token
    }
}

/// Returns `true` for fragments that mean "absent".
pub fn is_null_fragment(fragment: &str) -> bool {
    fragment.is_empty()
        || fragment.eq_ignore_ascii_case("null")
        || fragment.eq_ignore_ascii_case("none")
}

#[async_trait]
impl PathConverter for Nullable {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        if is_null_fragment(fragment) {
            return Ok(PathValue::Null);
        }
        self.inner.to_value(fragment).await
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Null => Ok(self.null_token.clone()),
            other => self.inner.to_url(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::builtin::{BoolConverter, IntConverter};
    use crate::converters::dates::DateConverter;

    fn nullbool() -> Nullable {
        Nullable::new(Arc::new(BoolConverter::default()))
    }

    #[test]
    fn test_name_and_regex() {
        let conv = nullbool();
        assert_eq!(conv.name(), "nullbool");
        let re = regex::Regex::new(&format!("^(?:{})$", conv.regex())).unwrap();
        for ok in ["", "null", "NULL", "None", "true", "OFF"] {
            assert!(re.is_match(ok), "{ok}");
        }
        assert!(!re.is_match("maybe"));
    }

    #[tokio::test]
    async fn test_null_fragments() {
        let conv = nullbool();
        for raw in ["", "null", "NULL", "None", "none"] {
            assert_eq!(conv.to_value(raw).await.unwrap(), PathValue::Null, "{raw}");
        }
        assert_eq!(conv.to_value("yes").await.unwrap(), PathValue::Bool(true));
    }

    #[test]
    fn test_render() {
        let conv = nullbool();
        assert_eq!(conv.to_url(&PathValue::Null).unwrap(), "null");
        assert_eq!(conv.to_url(&PathValue::Bool(true)).unwrap(), "true");

        let custom = Nullable::with_token(Arc::new(IntConverter::default()), "none");
        assert_eq!(custom.to_url(&PathValue::Null).unwrap(), "none");
        assert_eq!(custom.null_token(), "none");
    }

    #[test]
    fn test_accepts_inner_plus_null() {
        let conv = Nullable::new(Arc::new(IntConverter::default()));
        assert_eq!(conv.accepts(), [ValueKind::Int, ValueKind::Null]);
        assert_eq!(
            conv.from_types(),
            vec![ValueKind::Int, ValueKind::Null, ValueKind::Str]
        );
    }

    #[test]
    fn test_strips_inner_groups() {
        let conv = Nullable::new(Arc::new(DateConverter::default()));
        let re = regex::Regex::new(conv.regex()).unwrap();
        assert_eq!(re.captures_len(), 1);
    }
}
