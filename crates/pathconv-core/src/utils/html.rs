//! HTML escaping.

/// Escapes the five HTML-significant characters.
///
/// # Examples
///
/// ```
/// use pathconv_core::utils::escape_html;
///
/// assert_eq!(escape_html("<date:…>"), "&lt;date:…&gt;");
/// ```
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(escape_html("[0-9]{4}"), "[0-9]{4}");
    }
}
