//! Regex composition helpers.
//!
//! Converter regexes are spliced into route patterns and into each other
//! (nullable and combined converters). Named groups inside a spliced regex
//! would collide with the route's own groups, so they are rewritten to
//! non-capturing groups first.

use std::convert::Infallible;

use regex_syntax::ast::parse::Parser;
use regex_syntax::ast::{self, Ast, GroupKind, Visitor};

/// Rewrites every named capture group opener into a non-capturing group.
///
/// Both `(?P<name>` and `(?<name>` are rewritten to `(?:`; everything else is
/// kept byte for byte. The pattern is parsed, so escapes and character
/// classes are read the way the regex engine reads them. A pattern that does
/// not parse is returned unchanged and fails later when compiled.
///
/// # Examples
///
/// ```
/// use pathconv_core::utils::strip_capture_groups;
///
/// assert_eq!(
///     strip_capture_groups("(?P<year>[0-9]{4})-(?<month>[0-9]{2})"),
///     "(?:[0-9]{4})-(?:[0-9]{2})"
/// );
/// ```
pub fn strip_capture_groups(pattern: &str) -> String {
    let openers = match Parser::new().parse(pattern) {
        Ok(parsed) => ast::visit(&parsed, NamedOpeners::default()).unwrap_or_else(|never| match never {}),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "regex does not parse, left as is");
            return pattern.to_string();
        }
    };

    let mut out = String::with_capacity(pattern.len());
    let mut last = 0;
    for (start, end) in openers {
        out.push_str(&pattern[last..start]);
        out.push_str("(?:");
        last = end;
    }
    out.push_str(&pattern[last..]);
    out
}

/// Byte ranges of named group openers, from `(` up to the group body, in
/// pattern order.
#[derive(Default)]
struct NamedOpeners(Vec<(usize, usize)>);

impl Visitor for NamedOpeners {
    type Output = Vec<(usize, usize)>;
    type Err = Infallible;

    fn finish(self) -> Result<Self::Output, Self::Err> {
        Ok(self.0)
    }

    fn visit_pre(&mut self, ast: &Ast) -> Result<(), Self::Err> {
        if let Ast::Group(group) = ast {
            if matches!(group.kind, GroupKind::CaptureName { .. }) {
                self.0
                    .push((group.span.start.offset, group.ast.span().start.offset));
            }
        }
        Ok(())
    }
}

/// Wraps a regex so it must match the whole input.
pub fn anchored(pattern: &str) -> String {
    format!("^(?:{pattern})$")
}
