//! URL resolver and namespace support.
//!
//! This module provides [`URLResolver`] for hierarchical URL resolution,
//! including namespaces and the `include()` function. Resolution is async
//! because converters may query while turning fragments into values.

use std::collections::HashMap;
use std::fmt;

use pathconv_core::utils::strip_capture_groups;
use pathconv_core::{PathconvError, PathconvResult};

use super::pattern::{self, BoxFuture, ConverterEntry, URLPattern, ViewFn};
use crate::converters::registry::ConverterRegistry;
use crate::converters::PathValue;

/// A named pattern with its fully-qualified name, full route and every
/// converter along the way (prefixes included).
#[derive(Debug, Clone)]
pub struct NamedPattern {
    /// Namespaced name, e.g. `"api:user-detail"`.
    pub name: String,
    /// The concatenated route template.
    pub route: String,
    /// Converters by parameter name.
    pub converters: Vec<ConverterEntry>,
    /// Whether the leaf pattern is a raw regex.
    pub is_regex: bool,
}

/// A leaf pattern flattened into one regex, as audited for overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRegex {
    /// The concatenated route.
    pub route: String,
    /// The full regex, anchored at both ends and without capture groups.
    pub regex: String,
    /// Namespaced name, if the pattern has one.
    pub name: Option<String>,
}

/// The result of successfully resolving a URL path to a view.
///
/// `kwargs` holds converted values; view middleware may rewrite them before
/// the view runs.
#[derive(Clone)]
pub struct ResolverMatch {
    /// The view to call.
    pub func: ViewFn,
    /// Converted keyword arguments extracted from the URL path.
    pub kwargs: HashMap<String, PathValue>,
    /// The name of the matched URL pattern, if any.
    pub url_name: Option<String>,
    /// The application names in the resolution chain (outermost first).
    pub app_names: Vec<String>,
    /// The instance namespaces in the resolution chain (outermost first).
    pub namespaces: Vec<String>,
    /// The matched route string.
    pub route: String,
}

impl fmt::Debug for ResolverMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverMatch")
            .field("kwargs", &self.kwargs)
            .field("url_name", &self.url_name)
            .field("app_names", &self.app_names)
            .field("namespaces", &self.namespaces)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

impl ResolverMatch {
    /// Returns the fully-qualified view name, including namespaces.
    pub fn view_name(&self) -> String {
        let mut parts: Vec<&str> = self.namespaces.iter().map(String::as_str).collect();
        if let Some(name) = &self.url_name {
            parts.push(name);
        }
        parts.join(":")
    }

    /// Returns a keyword argument.
    pub fn kwarg(&self, name: &str) -> Option<&PathValue> {
        self.kwargs.get(name)
    }

    /// Calls the view with this match.
    pub async fn call(self) -> PathconvResult<String> {
        let func = self.func.clone();
        func(self).await
    }
}

/// An entry in a URL configuration, either a leaf pattern or a nested resolver.
pub enum URLEntry {
    /// A leaf URL pattern that maps to a view.
    Pattern(URLPattern),
    /// A nested resolver, typically created via `include()`.
    Resolver(URLResolver),
}

impl fmt::Debug for URLEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            Self::Resolver(r) => f.debug_tuple("Resolver").field(r).finish(),
        }
    }
}

/// A URL resolver that matches a prefix and delegates to child patterns.
pub struct URLResolver {
    /// The prefix pattern for this resolver
    pattern: URLPattern,
    /// Child URL patterns and sub-resolvers
    url_patterns: Vec<URLEntry>,
    /// The instance namespace for this resolver
    namespace: Option<String>,
    /// The application namespace for this resolver
    app_name: Option<String>,
}

impl fmt::Debug for URLResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("URLResolver")
            .field("pattern", &self.pattern)
            .field("url_patterns", &self.url_patterns)
            .field("namespace", &self.namespace)
            .field("app_name", &self.app_name)
            .finish()
    }
}

fn not_found(path: &str) -> PathconvError {
    PathconvError::NotFound(format!("No URL pattern matches '{path}'"))
}

impl URLResolver {
    /// Creates a new resolver with the given prefix pattern and child entries.
    pub fn new(
        pattern: URLPattern,
        url_patterns: Vec<URLEntry>,
        namespace: Option<&str>,
        app_name: Option<&str>,
    ) -> Self {
        Self {
            pattern,
            url_patterns,
            namespace: namespace.map(String::from),
            app_name: app_name.map(String::from),
        }
    }

    /// Returns the prefix pattern.
    pub const fn pattern(&self) -> &URLPattern {
        &self.pattern
    }

    /// Returns the child URL entries.
    pub fn url_patterns(&self) -> &[URLEntry] {
        &self.url_patterns
    }

    /// Returns the instance namespace, if set.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the application namespace, if set.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// Resolves a URL path (without its leading slash) to a
    /// [`ResolverMatch`].
    ///
    /// Tries each child pattern/resolver in order. A converter rejecting its
    /// fragment moves on to the next candidate.
    ///
    /// # Errors
    ///
    /// [`PathconvError::NotFound`] if no pattern matches; any non-rejection
    /// error raised by a converter.
    pub fn resolve<'a>(&'a self, path: &'a str) -> BoxFuture<'a, PathconvResult<ResolverMatch>> {
        Box::pin(async move {
            let (prefix_kwargs, remaining) = self
                .pattern
                .match_path(path)
                .await?
                .ok_or_else(|| not_found(path))?;

            for entry in &self.url_patterns {
                let found = match entry {
                    URLEntry::Pattern(child) => {
                        child.full_match(remaining).await?.map(|kwargs| ResolverMatch {
                            func: child.callback().clone(),
                            kwargs,
                            url_name: child.name().map(String::from),
                            app_names: Vec::new(),
                            namespaces: Vec::new(),
                            route: child.route().to_string(),
                        })
                    }
                    URLEntry::Resolver(child) => match child.resolve(remaining).await {
                        Ok(m) => Some(m),
                        Err(PathconvError::NotFound(_)) => None,
                        Err(e) => return Err(e),
                    },
                };

                if let Some(mut m) = found {
                    for (k, v) in &prefix_kwargs {
                        m.kwargs.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                    if let Some(ns) = &self.namespace {
                        m.namespaces.insert(0, ns.clone());
                    }
                    if let Some(app) = &self.app_name {
                        m.app_names.insert(0, app.clone());
                    }
                    m.route = format!("{}{}", self.pattern.route(), m.route);
                    return Ok(m);
                }
            }

            Err(not_found(path))
        })
    }

    /// Collects all named patterns in this resolver tree, with their
    /// fully-qualified names.
    pub fn collect_named_patterns(&self) -> Vec<NamedPattern> {
        let mut result = Vec::new();
        self.collect_named_inner(&mut result, &[], "", &[]);
        result
    }

    fn collect_named_inner(
        &self,
        result: &mut Vec<NamedPattern>,
        parent_namespaces: &[String],
        parent_route: &str,
        parent_converters: &[ConverterEntry],
    ) {
        let mut namespaces = parent_namespaces.to_vec();
        if let Some(ns) = &self.namespace {
            namespaces.push(ns.clone());
        }
        let route = format!("{parent_route}{}", self.pattern.route());
        let mut converters = parent_converters.to_vec();
        converters.extend(self.pattern.converters().iter().cloned());

        for entry in &self.url_patterns {
            match entry {
                URLEntry::Pattern(child) => {
                    if let Some(name) = child.name() {
                        let name = if namespaces.is_empty() {
                            name.to_string()
                        } else {
                            format!("{}:{name}", namespaces.join(":"))
                        };
                        let mut all = converters.clone();
                        all.extend(child.converters().iter().cloned());
                        result.push(NamedPattern {
                            name,
                            route: format!("{route}{}", child.route()),
                            converters: all,
                            is_regex: child.is_regex(),
                        });
                    }
                }
                URLEntry::Resolver(child) => {
                    child.collect_named_inner(result, &namespaces, &route, &converters);
                }
            }
        }
    }

    /// Flattens the tree into one anchored regex per leaf pattern, in
    /// resolution order.
    pub fn route_regexes(&self) -> Vec<RouteRegex> {
        let mut result = Vec::new();
        self.route_regexes_inner(&mut result, &[], "", "");
        result
    }

    fn route_regexes_inner(
        &self,
        result: &mut Vec<RouteRegex>,
        parent_namespaces: &[String],
        parent_route: &str,
        parent_body: &str,
    ) {
        let mut namespaces = parent_namespaces.to_vec();
        if let Some(ns) = &self.namespace {
            namespaces.push(ns.clone());
        }
        let route = format!("{parent_route}{}", self.pattern.route());
        let body = format!("{parent_body}{}", group(&self.pattern));

        for entry in &self.url_patterns {
            match entry {
                URLEntry::Pattern(child) => {
                    let name = child.name().map(|n| {
                        if namespaces.is_empty() {
                            n.to_string()
                        } else {
                            format!("{}:{n}", namespaces.join(":"))
                        }
                    });
                    result.push(RouteRegex {
                        route: format!("{route}{}", child.route()),
                        regex: format!("^{body}{}$", group(child)),
                        name,
                    });
                }
                URLEntry::Resolver(child) => {
                    child.route_regexes_inner(result, &namespaces, &route, &body);
                }
            }
        }
    }
}

/// Raw regex bodies may contain top-level alternation, so they are grouped
/// before concatenation. Names are stripped since an include and its leaves
/// may reuse a parameter name.
fn group(pattern: &URLPattern) -> String {
    let body = strip_capture_groups(pattern.body());
    if pattern.is_regex() {
        format!("(?:{body})")
    } else {
        body
    }
}

/// Creates a `URLResolver` from a prefix path and a set of child patterns,
/// with prefix converters from the global registry.
///
/// # Errors
///
/// Returns an error if the prefix route is invalid.
pub fn include(
    prefix: &str,
    patterns: Vec<URLEntry>,
    namespace: Option<&str>,
    app_name: Option<&str>,
) -> PathconvResult<URLResolver> {
    let prefix_pattern = pattern::path_prefix(prefix)?;
    Ok(URLResolver::new(prefix_pattern, patterns, namespace, app_name))
}

/// Like [`include`], with prefix converters from `registry`.
///
/// # Errors
///
/// Returns an error if the prefix route is invalid.
pub fn include_with(
    registry: &ConverterRegistry,
    prefix: &str,
    patterns: Vec<URLEntry>,
    namespace: Option<&str>,
    app_name: Option<&str>,
) -> PathconvResult<URLResolver> {
    let prefix_pattern = pattern::path_prefix_with(registry, prefix)?;
    Ok(URLResolver::new(prefix_pattern, patterns, namespace, app_name))
}

/// Creates a root resolver (matches empty prefix) with the given URL entries.
///
/// # Errors
///
/// Returns an error if pattern creation fails.
pub fn root(patterns: Vec<URLEntry>) -> PathconvResult<URLResolver> {
    let prefix_pattern = pattern::path_prefix_with(&ConverterRegistry::default(), "")?;
    Ok(URLResolver::new(prefix_pattern, patterns, None, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::registry::ConverterRegistry;
    use crate::urls::pattern::{path_with, re_path, view};
    use pathconv_core::ConverterSettings;

    fn registry() -> ConverterRegistry {
        ConverterRegistry::with_builtins(ConverterSettings::default()).unwrap()
    }

    fn dummy_view() -> ViewFn {
        view(|_m| async { Ok("ok".to_string()) })
    }

    fn leaf(reg: &ConverterRegistry, route: &str, name: &str) -> URLEntry {
        URLEntry::Pattern(path_with(reg, route, dummy_view(), Some(name)).unwrap())
    }

    #[tokio::test]
    async fn test_resolve_simple_pattern() {
        let reg = registry();
        let resolver = root(vec![leaf(&reg, "articles/", "articles")]).unwrap();
        let m = resolver.resolve("articles/").await.unwrap();
        assert_eq!(m.url_name.as_deref(), Some("articles"));
        assert!(m.kwargs.is_empty());
        assert_eq!(m.call().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_rejection_falls_through_to_next_pattern() {
        let reg = registry();
        let resolver = root(vec![
            leaf(&reg, "day/<date:d>/", "by-date"),
            leaf(&reg, "day/<str:d>/", "by-str"),
        ])
        .unwrap();

        let m = resolver.resolve("day/2023-02-03/").await.unwrap();
        assert_eq!(m.url_name.as_deref(), Some("by-date"));

        let m = resolver.resolve("day/2023-02-31/").await.unwrap();
        assert_eq!(m.url_name.as_deref(), Some("by-str"));
        assert_eq!(m.kwargs["d"], PathValue::Str("2023-02-31".into()));
    }

    #[tokio::test]
    async fn test_not_found() {
        let reg = registry();
        let resolver = root(vec![leaf(&reg, "a/", "a")]).unwrap();
        let err = resolver.resolve("b/").await.unwrap_err();
        assert!(matches!(err, PathconvError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_include_merges_prefix_kwargs_and_namespaces() {
        let reg = registry();
        let users = include_with(
            &reg,
            "users/<int:uid>/",
            vec![leaf(&reg, "posts/<int:pid>/", "post")],
            Some("users"),
            Some("accounts"),
        )
        .unwrap();
        let resolver = root(vec![URLEntry::Resolver(users)]).unwrap();

        let m = resolver.resolve("users/3/posts/9/").await.unwrap();
        assert_eq!(m.kwargs["uid"], PathValue::Int(3));
        assert_eq!(m.kwargs["pid"], PathValue::Int(9));
        assert_eq!(m.view_name(), "users:post");
        assert_eq!(m.app_names, vec!["accounts"]);
        assert_eq!(m.route, "users/<int:uid>/posts/<int:pid>/");
    }

    #[test]
    fn test_collect_named_patterns_includes_prefix_converters() {
        let reg = registry();
        let users = include_with(
            &reg,
            "users/<int:uid>/",
            vec![leaf(&reg, "posts/<int:pid>/", "post")],
            Some("users"),
            None,
        )
        .unwrap();
        let resolver = root(vec![URLEntry::Resolver(users), leaf(&reg, "", "home")]).unwrap();

        let named = resolver.collect_named_patterns();
        assert_eq!(named.len(), 2);
        assert_eq!(named[0].name, "users:post");
        assert_eq!(named[0].route, "users/<int:uid>/posts/<int:pid>/");
        let params: Vec<&str> = named[0].converters.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(params, vec!["uid", "pid"]);
        assert_eq!(named[1].name, "home");
    }

    #[test]
    fn test_route_regexes_flatten_tree() {
        let reg = registry();
        let nested = include_with(&reg, "api/", vec![leaf(&reg, "<int:id>/", "item")], Some("api"), None)
            .unwrap();
        let resolver = root(vec![
            URLEntry::Resolver(nested),
            URLEntry::Pattern(re_path("a|b", dummy_view(), None).unwrap()),
        ])
        .unwrap();

        let regexes = resolver.route_regexes();
        assert_eq!(regexes.len(), 2);
        assert_eq!(regexes[0].regex, "^api/(?:[0-9]+)/$");
        assert_eq!(regexes[0].name.as_deref(), Some("api:item"));
        assert_eq!(regexes[1].regex, "^(?:a|b)$");
        assert_eq!(regexes[1].route, "a|b");
    }

    #[tokio::test]
    async fn test_prefix_and_leaf_share_a_parameter_name() {
        let reg = registry();
        let users = include_with(&reg, "users/<int:id>/", vec![leaf(&reg, "<int:id>/", "detail")], None, None)
            .unwrap();
        let resolver = root(vec![URLEntry::Resolver(users)]).unwrap();

        let m = resolver.resolve("users/1/2/").await.unwrap();
        assert_eq!(m.kwargs["id"], PathValue::Int(2));

        let regexes = resolver.route_regexes();
        assert_eq!(regexes[0].regex, "^users/(?:[0-9]+)/(?:[0-9]+)/$");
        let flattened = regex::Regex::new(&regexes[0].regex).unwrap();
        assert!(flattened.is_match("users/1/2/"));
        assert!(!flattened.is_match("users/1/"));
    }
}
