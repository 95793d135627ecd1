//! URL path pattern parsing and matching.
//!
//! This module provides [`URLPattern`] for defining URL routes using either
//! django-style `path()` syntax (e.g., `archive/<date:day>/`) or regex-based
//! `re_path()` syntax. Placeholders name a converter from a
//! [`ConverterRegistry`]; a matched fragment is only accepted once the
//! converter turns it into a value.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pathconv_core::utils::strip_capture_groups;
use pathconv_core::{PathconvError, PathconvResult};
use regex::Regex;

use super::resolver::ResolverMatch;
use crate::converters::registry::{registry, ConverterRegistry};
use crate::converters::{PathConverter, PathValue};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The type for view functions.
///
/// A view receives the [`ResolverMatch`] (after view middleware ran) and
/// returns the response body.
pub type ViewFn = Arc<dyn Fn(ResolverMatch) -> BoxFuture<'static, PathconvResult<String>> + Send + Sync>;

/// A named converter entry: `(parameter_name, converter)`.
pub type ConverterEntry = (String, Arc<dyn PathConverter>);

/// Wraps an async closure into a [`ViewFn`].
///
/// # Examples
///
/// ```
/// use pathconv_urls::urls::pattern::view;
///
/// let home = view(|m| async move { Ok(format!("{} kwargs", m.kwargs.len())) });
/// # let _ = home;
/// ```
pub fn view<F, Fut>(f: F) -> ViewFn
where
    F: Fn(ResolverMatch) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PathconvResult<String>> + Send + 'static,
{
    Arc::new(move |m| Box::pin(f(m)))
}

/// A single URL pattern that matches a path and names a view.
pub struct URLPattern {
    /// The original route string (e.g., `"archive/<date:day>/"`)
    route: String,
    /// The unanchored regex body
    body: String,
    /// The compiled, anchored regex used for matching
    regex: Regex,
    /// An optional name for reverse URL lookup
    name: Option<String>,
    /// Named converters extracted from the route, in order
    converters: Vec<ConverterEntry>,
    /// Whether the route was given as a raw regex
    is_regex: bool,
    /// The view to invoke on match
    callback: ViewFn,
}

impl fmt::Debug for URLPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("URLPattern")
            .field("route", &self.route)
            .field("regex", &self.regex.as_str())
            .field("name", &self.name)
            .field("converters", &self.converters)
            .finish_non_exhaustive()
    }
}

impl URLPattern {
    /// Returns the original route string.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns the regex without anchors, as spliced into full route regexes.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the compiled regex pattern.
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Returns the optional name for this pattern.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the named converters for this pattern.
    pub fn converters(&self) -> &[ConverterEntry] {
        &self.converters
    }

    /// Returns `true` for patterns built by [`re_path`].
    pub const fn is_regex(&self) -> bool {
        self.is_regex
    }

    /// Returns a reference to the view.
    pub fn callback(&self) -> &ViewFn {
        &self.callback
    }

    /// Attempts to match the start of `path` against this pattern.
    ///
    /// Returns `Some((kwargs, remaining_path))` on success. A converter
    /// rejecting its fragment is a non-match (`Ok(None)`); any other
    /// conversion error is returned.
    pub async fn match_path<'p>(
        &self,
        path: &'p str,
    ) -> PathconvResult<Option<(HashMap<String, PathValue>, &'p str)>> {
        let Some(captures) = self.regex.captures(path) else {
            return Ok(None);
        };
        let end = captures.get(0).map_or(0, |m| m.end());

        let mut kwargs = HashMap::new();

        if self.is_regex {
            // Named groups of raw regexes are passed through as strings.
            for name in self.regex.capture_names().flatten() {
                if let Some(m) = captures.name(name) {
                    kwargs.insert(name.to_string(), PathValue::Str(m.as_str().to_string()));
                }
            }
        } else {
            for (name, converter) in &self.converters {
                let raw = captures.name(name).map_or("", |m| m.as_str());
                match converter.to_value(raw).await {
                    Ok(value) => {
                        kwargs.insert(name.clone(), value);
                    }
                    Err(e) if e.is_rejection() => {
                        tracing::trace!(route = %self.route, param = %name, error = %e, "converter rejected fragment");
                        return Ok(None);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(Some((kwargs, &path[end..])))
    }

    /// Attempts a full match of the path (no remaining portion allowed).
    pub async fn full_match(&self, path: &str) -> PathconvResult<Option<HashMap<String, PathValue>>> {
        Ok(self
            .match_path(path)
            .await?
            .and_then(|(kwargs, remaining)| remaining.is_empty().then_some(kwargs)))
    }
}

/// Parses the `<type:name>` portion of a pattern segment, returning `(type_name, param_name)`.
/// Defaults to `"str"` if no colon is present.
fn parse_type_and_name(inner: &str) -> (&str, &str) {
    inner
        .find(':')
        .map_or(("str", inner), |pos| (&inner[..pos], &inner[pos + 1..]))
}

/// Parses a django-style route into an unanchored regex body and its
/// converters.
fn parse_route(
    registry: &ConverterRegistry,
    route: &str,
) -> PathconvResult<(String, Vec<ConverterEntry>)> {
    let mut body = String::new();
    let mut converter_list: Vec<ConverterEntry> = Vec::new();
    let mut remaining = route;

    while !remaining.is_empty() {
        if let Some(start) = remaining.find('<') {
            body.push_str(&regex::escape(&remaining[..start]));

            let end = remaining[start..].find('>').ok_or_else(|| {
                PathconvError::ImproperlyConfigured(format!(
                    "Unclosed angle bracket in route: {route}"
                ))
            })? + start;

            let (type_name, param_name) = parse_type_and_name(&remaining[start + 1..end]);
            if converter_list.iter().any(|(n, _)| n == param_name) {
                return Err(PathconvError::ImproperlyConfigured(format!(
                    "Route '{route}' uses parameter '{param_name}' twice"
                )));
            }

            let converter = registry.get(type_name)?;
            write!(
                body,
                "(?P<{param_name}>{})",
                strip_capture_groups(converter.regex())
            )
            .ok();
            converter_list.push((param_name.to_string(), converter));

            remaining = &remaining[end + 1..];
        } else {
            body.push_str(&regex::escape(remaining));
            break;
        }
    }

    Ok((body, converter_list))
}

fn compile(regex_str: &str, route: &str) -> PathconvResult<Regex> {
    Regex::new(regex_str).map_err(|e| {
        PathconvError::ImproperlyConfigured(format!("Invalid pattern regex for '{route}': {e}"))
    })
}

/// Creates a URL pattern with converters from `registry`.
///
/// # Errors
///
/// Returns an error if the route names an unknown converter, repeats a
/// parameter, or has invalid syntax.
pub fn path_with(
    registry: &ConverterRegistry,
    route: &str,
    callback: ViewFn,
    name: Option<&str>,
) -> PathconvResult<URLPattern> {
    let (body, converters) = parse_route(registry, route)?;
    let regex = compile(&format!("^{body}$"), route)?;

    Ok(URLPattern {
        route: route.to_string(),
        body,
        regex,
        name: name.map(String::from),
        converters,
        is_regex: false,
        callback,
    })
}

/// Creates a URL pattern with converters from the global registry.
///
/// # Errors
///
/// See [`path_with`].
pub fn path(route: &str, callback: ViewFn, name: Option<&str>) -> PathconvResult<URLPattern> {
    path_with(&registry(), route, callback, name)
}

/// Creates a URL pattern using a raw regex.
///
/// Named groups in the regex (e.g., `(?P<year>[0-9]{4})`) are passed to the
/// view as strings. No converters are applied.
///
/// # Errors
///
/// Returns an error if the regex is invalid.
pub fn re_path(regex_str: &str, callback: ViewFn, name: Option<&str>) -> PathconvResult<URLPattern> {
    let body = regex_str.strip_prefix('^').unwrap_or(regex_str);
    let body = body.strip_suffix('$').unwrap_or(body).to_string();
    let regex = compile(&format!("^(?:{body})$"), regex_str)?;

    Ok(URLPattern {
        route: regex_str.to_string(),
        body,
        regex,
        name: name.map(String::from),
        converters: Vec::new(),
        is_regex: true,
        callback,
    })
}

/// Creates a prefix pattern with converters from `registry`.
///
/// Unlike [`path_with`], this pattern does not anchor to the end of the
/// string, so it matches a prefix of the URL path.
///
/// # Errors
///
/// Returns an error if the route names an unknown converter or has invalid
/// syntax.
pub fn path_prefix_with(registry: &ConverterRegistry, route: &str) -> PathconvResult<URLPattern> {
    let (body, converters) = parse_route(registry, route)?;
    let regex = compile(&format!("^{body}"), route)?;

    let not_found: ViewFn = view(|m: ResolverMatch| async move {
        Err(PathconvError::NotFound(format!("'{}' is a prefix", m.route)))
    });

    Ok(URLPattern {
        route: route.to_string(),
        body,
        regex,
        name: None,
        converters,
        is_regex: false,
        callback: not_found,
    })
}

/// Creates a prefix pattern with converters from the global registry.
///
/// # Errors
///
/// See [`path_prefix_with`].
pub fn path_prefix(route: &str) -> PathconvResult<URLPattern> {
    path_prefix_with(&registry(), route)
}
