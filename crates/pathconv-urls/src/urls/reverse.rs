//! Reverse URL resolution.
//!
//! [`reverse`] builds a URL for a named pattern, rendering each value through
//! its converter's `to_url` and percent-encoding the rendered fragment.

use std::collections::HashMap;
use std::hash::BuildHasher;

use pathconv_core::{PathconvError, PathconvResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::pattern::ConverterEntry;
use super::resolver::URLResolver;
use crate::converters::registry::compile;
use crate::converters::PathValue;

/// Bytes left as is in a rendered fragment: RFC 3986 unreserved characters,
/// sub-delimiters, `/`, `:` and `@`.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'/')
    .remove(b':')
    .remove(b'@');

/// Generates a URL for a named view.
///
/// Namespaced lookups use colon-separated names (e.g., `"api:user-detail"`).
/// When several patterns share the name, the first one whose parameters can
/// all be rendered wins.
///
/// Fragments are validated against the converter regex before they are
/// percent-encoded, so the result resolves again once the request path is
/// decoded.
///
/// # Errors
///
/// [`PathconvError::NotFound`] if no pattern has the name, a parameter has no
/// value, or a rendered fragment does not match its converter's regex. A
/// converter that cannot render the value reports its own error.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::collections::HashMap;
/// use pathconv_core::ConverterSettings;
/// use pathconv_urls::converters::registry::ConverterRegistry;
/// use pathconv_urls::converters::PathValue;
/// use pathconv_urls::urls::pattern::{path_with, view};
/// use pathconv_urls::urls::resolver::{root, URLEntry};
/// use pathconv_urls::urls::reverse::reverse;
///
/// let registry = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
/// let archive = view(|_m| async { Ok(String::new()) });
/// let urls = root(vec![URLEntry::Pattern(
///     path_with(&registry, "archive/<date:day>/", archive, Some("archive")).unwrap(),
/// )])
/// .unwrap();
///
/// let day = chrono::NaiveDate::from_ymd_opt(1958, 3, 25).unwrap();
/// let kwargs = HashMap::from([("day", PathValue::Date(day))]);
/// assert_eq!(reverse("archive", &kwargs, &urls).unwrap(), "/archive/1958-03-25/");
/// # }
/// ```
pub fn reverse<S: BuildHasher>(
    viewname: &str,
    kwargs: &HashMap<&str, PathValue, S>,
    urlconf: &URLResolver,
) -> PathconvResult<String> {
    let mut last_error = None;

    for named in urlconf.collect_named_patterns() {
        if named.name != viewname {
            continue;
        }
        if named.is_regex {
            last_error = Some(PathconvError::NotFound(format!(
                "Reverse for '{viewname}' names a regex pattern"
            )));
            continue;
        }
        match substitute_pattern(&named.route, &named.converters, kwargs) {
            Ok(url) => {
                let url = if url.starts_with('/') {
                    url
                } else {
                    format!("/{url}")
                };
                return Ok(url);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error
        .unwrap_or_else(|| PathconvError::NotFound(format!("Reverse for '{viewname}' not found"))))
}

/// Replaces `<type:name>` placeholders with rendered values.
fn substitute_pattern<S: BuildHasher>(
    route: &str,
    converters: &[ConverterEntry],
    kwargs: &HashMap<&str, PathValue, S>,
) -> PathconvResult<String> {
    let mut result = String::new();
    let mut remaining = route;

    while !remaining.is_empty() {
        if let Some(start) = remaining.find('<') {
            result.push_str(&remaining[..start]);

            let end = remaining[start..].find('>').ok_or_else(|| {
                PathconvError::ImproperlyConfigured(format!(
                    "Unclosed angle bracket in route template: {route}"
                ))
            })? + start;

            let inner = &remaining[start + 1..end];
            let param_name = inner.find(':').map_or(inner, |pos| &inner[pos + 1..]);

            let value = kwargs.get(param_name).ok_or_else(|| {
                PathconvError::NotFound(format!(
                    "No value provided for parameter '{param_name}' in URL pattern"
                ))
            })?;
            let converter = converters
                .iter()
                .find(|(n, _)| n == param_name)
                .map(|(_, c)| c)
                .ok_or_else(|| {
                    PathconvError::ImproperlyConfigured(format!(
                        "No converter for parameter '{param_name}' in route: {route}"
                    ))
                })?;

            let fragment = converter.to_url(value)?;
            if !compile(converter.as_ref())?.is_match(&fragment) {
                return Err(PathconvError::NotFound(format!(
                    "'{fragment}' does not match converter '{}' for parameter '{param_name}'",
                    converter.name()
                )));
            }
            result.extend(utf8_percent_encode(&fragment, PATH_SAFE));

            remaining = &remaining[end + 1..];
        } else {
            result.push_str(remaining);
            break;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::registry::ConverterRegistry;
    use crate::urls::pattern::{path_with, re_path, view, ViewFn};
    use crate::urls::resolver::{include_with, root, URLEntry};
    use pathconv_core::ConverterSettings;

    fn dummy_view() -> ViewFn {
        view(|_m| async { Ok("ok".to_string()) })
    }

    fn urls() -> URLResolver {
        let reg = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
        let api = include_with(
            &reg,
            "api/",
            vec![URLEntry::Pattern(
                path_with(&reg, "flags/<nullbool:on>/", dummy_view(), Some("flag")).unwrap(),
            )],
            Some("api"),
            None,
        )
        .unwrap();
        root(vec![
            URLEntry::Resolver(api),
            URLEntry::Pattern(
                path_with(&reg, "range/<daterange:span>/", dummy_view(), Some("range")).unwrap(),
            ),
            URLEntry::Pattern(
                path_with(&reg, "page/<int:n>/", dummy_view(), Some("page")).unwrap(),
            ),
            URLEntry::Pattern(re_path("raw/", dummy_view(), Some("raw")).unwrap()),
        ])
        .unwrap()
    }

    #[test]
    fn test_reverse_namespaced_nullable() {
        let kwargs = HashMap::from([("on", PathValue::Null)]);
        assert_eq!(reverse("api:flag", &kwargs, &urls()).unwrap(), "/api/flags/null/");
        let kwargs = HashMap::from([("on", PathValue::Bool(true))]);
        assert_eq!(reverse("api:flag", &kwargs, &urls()).unwrap(), "/api/flags/true/");
    }

    #[test]
    fn test_reverse_combined() {
        let d = |m, day| PathValue::Date(chrono::NaiveDate::from_ymd_opt(2023, m, day).unwrap());
        let span = PathValue::Tuple(vec![("start".into(), d(1, 1)), ("end".into(), d(1, 31))]);
        let kwargs = HashMap::from([("span", span)]);
        assert_eq!(
            reverse("range", &kwargs, &urls()).unwrap(),
            "/range/2023-01-01/2023-01-31/"
        );
    }

    #[test]
    fn test_reverse_string_passthrough_must_match() {
        let kwargs = HashMap::from([("n", PathValue::Str("12".into()))]);
        assert_eq!(reverse("page", &kwargs, &urls()).unwrap(), "/page/12/");

        let kwargs = HashMap::from([("n", PathValue::Str("twelve".into()))]);
        assert!(matches!(
            reverse("page", &kwargs, &urls()),
            Err(PathconvError::NotFound(_))
        ));
    }

    #[test]
    fn test_reverse_percent_encodes_fragments() {
        let reg = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
        let urls = root(vec![
            URLEntry::Pattern(path_with(&reg, "s/<str:s>/", dummy_view(), Some("echo")).unwrap()),
            URLEntry::Pattern(path_with(&reg, "j/<json:j>/", dummy_view(), Some("json")).unwrap()),
            URLEntry::Pattern(path_with(&reg, "p/<path:p>/", dummy_view(), Some("file")).unwrap()),
        ])
        .unwrap();

        let kwargs = HashMap::from([("s", PathValue::Str("with space?#".into()))]);
        assert_eq!(reverse("echo", &kwargs, &urls).unwrap(), "/s/with%20space%3F%23/");

        let kwargs = HashMap::from([("j", PathValue::Json(serde_json::json!({"id": 5})))]);
        assert_eq!(reverse("json", &kwargs, &urls).unwrap(), "/j/%7B%22id%22:5%7D/");

        let kwargs = HashMap::from([("p", PathValue::Str("a/b c/é".into()))]);
        assert_eq!(reverse("file", &kwargs, &urls).unwrap(), "/p/a/b%20c/%C3%A9/");
    }

    #[tokio::test]
    async fn test_reversed_url_resolves_after_decoding() {
        let reg = ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap();
        let urls = root(vec![URLEntry::Pattern(
            path_with(&reg, "s/<str:s>/", dummy_view(), Some("echo")).unwrap(),
        )])
        .unwrap();
        let value = PathValue::Str("50% off".into());
        let url = reverse("echo", &HashMap::from([("s", value.clone())]), &urls).unwrap();
        assert_eq!(url, "/s/50%25%20off/");

        let decoded = percent_encoding::percent_decode_str(&url).decode_utf8().unwrap();
        let m = urls.resolve(decoded.trim_start_matches('/')).await.unwrap();
        assert_eq!(m.kwargs["s"], value);
    }

    #[test]
    fn test_reverse_missing_value_or_name() {
        let empty: HashMap<&str, PathValue> = HashMap::new();
        assert!(reverse("page", &empty, &urls()).is_err());
        assert!(reverse("nope", &empty, &urls()).is_err());
        assert!(reverse("raw", &empty, &urls()).is_err());
    }
}
