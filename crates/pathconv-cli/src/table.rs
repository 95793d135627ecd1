//! Converter tables.
//!
//! [`text_table`] renders converter summaries as a plain-text grid for the
//! terminal, [`html_table`] as an HTML table for documentation and
//! [`markdown_table`] as a Markdown table for READMEs. Multi-valued cells
//! (types, examples) put one item per line.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use pathconv_core::utils::escape_html;
use pathconv_urls::ConverterSummary;

/// Column headers, in display order.
pub const HEADERS: [&str; 5] = ["name", "regex", "to_types", "from_types", "examples"];

const MAX_WIDTH: u16 = 128;

fn cells(summary: &ConverterSummary) -> [String; 5] {
    [
        summary.name.clone(),
        summary.regex.clone(),
        summary.to_types.join("\n"),
        summary.from_types.join("\n"),
        summary.examples.join("\n"),
    ]
}

/// Renders summaries as a bordered text table, in the given order.
pub fn text_table(summaries: &[ConverterSummary]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(MAX_WIDTH)
        .set_header(HEADERS);
    for summary in summaries {
        table.add_row(cells(summary));
    }
    table.to_string()
}

/// Wraps each line of `text` in an escaped `<code>` element, joined by
/// `<br/>`. Empty text yields an empty cell.
pub fn codify(text: &str, left: &str, right: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    text.split('\n')
        .map(|line| format!("<code>{}</code>", escape_html(&format!("{left}{line}{right}"))))
        .collect::<Vec<_>>()
        .join("<br/>")
}

/// Sorts summaries by name, the order both documentation tables use.
pub fn sorted(summaries: &[ConverterSummary]) -> Vec<&ConverterSummary> {
    let mut rows: Vec<&ConverterSummary> = summaries.iter().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Renders summaries as an HTML table sorted by name. Names are shown as
/// they appear in routes, `<name:…>`.
///
/// # Examples
///
/// ```
/// use pathconv_cli::table::html_table;
/// use pathconv_urls::ConverterSummary;
///
/// let html = html_table(&[ConverterSummary {
///     name: "int".into(),
///     regex: "[0-9]+".into(),
///     to_types: vec!["int".into()],
///     from_types: vec!["int".into(), "str".into()],
///     examples: vec!["42".into()],
/// }]);
/// assert!(html.contains("<td><code>&lt;int:…&gt;</code></td>"));
/// assert!(html.contains("<code>int</code><br/><code>str</code>"));
/// ```
pub fn html_table(summaries: &[ConverterSummary]) -> String {
    let mut out = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n    <tr style=\"text-align: right;\">\n");
    for header in HEADERS {
        out.push_str(&format!("      <th>{header}</th>\n"));
    }
    out.push_str("    </tr>\n  </thead>\n  <tbody>\n");

    for summary in sorted(summaries) {
        let [name, regex, to_types, from_types, examples] = cells(summary);
        out.push_str("    <tr>\n");
        out.push_str(&format!("      <td>{}</td>\n", codify(&name, "<", ":…>")));
        for cell in [regex, to_types, from_types, examples] {
            out.push_str(&format!("      <td>{}</td>\n", codify(&cell, "", "")));
        }
        out.push_str("    </tr>\n");
    }
    out.push_str("  </tbody>\n</table>");
    out
}

/// Renders summaries as a Markdown table sorted by name. Cells reuse the
/// HTML encoding, which Markdown renderers pass through.
pub fn markdown_table(summaries: &[ConverterSummary]) -> String {
    let mut out = format!("|{}|\n", HEADERS.join("|"));
    out.push_str(&format!("|{}|\n", ["---"; 5].join("|")));
    for summary in sorted(summaries) {
        let [name, regex, to_types, from_types, examples] = cells(summary);
        let row: Vec<String> = [
            codify(&name, "<", ":…>"),
            codify(&regex, "", ""),
            codify(&to_types, "", ""),
            codify(&from_types, "", ""),
            codify(&examples, "", ""),
        ]
        .iter()
        .map(|cell| cell.replace('|', "\\|"))
        .collect();
        out.push_str(&format!("|{}|\n", row.join("|")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, regex: &str, examples: &[&str]) -> ConverterSummary {
        ConverterSummary {
            name: name.to_string(),
            regex: regex.to_string(),
            to_types: vec!["str".to_string()],
            from_types: vec!["str".to_string()],
            examples: examples.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_codify() {
        assert_eq!(codify("", "<", ">"), "");
        assert_eq!(codify("a&b", "", ""), "<code>a&amp;b</code>");
        assert_eq!(
            codify("x\ny", "<", ":…>"),
            "<code>&lt;x:…&gt;</code><br/><code>&lt;y:…&gt;</code>"
        );
    }

    #[test]
    fn test_text_table_keeps_order_and_lines() {
        let text = text_table(&[summary("zeta", "[a-z]+", &["a", "b"]), summary("alpha", ".+", &[])]);
        for header in HEADERS {
            assert!(text.contains(header));
        }
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
    }

    #[test]
    fn test_html_table_sorted_by_name() {
        let html = html_table(&[summary("zeta", "[a-z]+", &["a"]), summary("alpha", "<.+>", &[])]);
        assert!(html.find("&lt;alpha:…&gt;").unwrap() < html.find("&lt;zeta:…&gt;").unwrap());
        assert!(html.contains("<code>&lt;.+&gt;</code>"));
        assert!(html.contains("<td></td>"));
        assert!(html.starts_with("<table"));
        assert!(html.ends_with("</table>"));
    }

    #[test]
    fn test_markdown_table() {
        let md = markdown_table(&[summary("slug", "[-a-z]+", &["a-b"])]);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "|name|regex|to_types|from_types|examples|");
        assert_eq!(lines[1], "|---|---|---|---|---|");
        assert!(lines[2].starts_with("|<code>&lt;slug:…&gt;</code>|"));

        let md = markdown_table(&[summary("bool", "(?i:true|false)", &[])]);
        assert!(md.contains("<code>(?i:true\\|false)</code>"));
    }
}
