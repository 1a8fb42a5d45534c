// src/extract/html.rs
// =============================================================================
// HtmlParser: finds the links on an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM, recovering from broken markup the way browsers do
// - Supports CSS selectors for finding elements
//
// Malformed HTML never fails here: html5ever always produces some tree, and
// anchors it can't make sense of just don't show up.
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

use super::DocumentParser;

#[derive(Debug, Clone)]
pub struct HtmlParser {
    anchors: Selector,
}

impl HtmlParser {
    pub fn new() -> Self {
        // Constant selector, known to be valid
        let anchors = Selector::parse("a[href]").expect("a[href] is a valid selector");
        Self { anchors }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for HtmlParser {
    fn extract_links(&self, html: &str, _base: &Url) -> Vec<String> {
        if html.is_empty() {
            return Vec::new();
        }

        let document = Html::parse_document(html);
        document
            .select(&self.anchors)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base() -> Url {
        Url::parse("https://example.com/page/").unwrap()
    }

    #[rstest]
    #[case("<html><body><p>No links here.</p></body></html>", vec![])]
    #[case("", vec![])]
    #[case(r#"<a href="https://www.rust-lang.org">Rust</a>"#, vec!["https://www.rust-lang.org"])]
    #[case(r#"<a href="/docs">Docs</a><a name="anchor">no href</a>"#, vec!["/docs"])]
    #[case(
        r##"
            <a href="https://rust-lang.org">Rust</a>
            <a href="/docs">Docs</a>
            <a href="../about">About</a>
            <a href="#top">Top</a>
            <a href="mailto:test@example.com">Email</a>
        "##,
        vec!["https://rust-lang.org", "/docs", "../about", "#top", "mailto:test@example.com"]
    )]
    #[case(r#"<a href="/first">unclosed<a href="/second">second"#, vec!["/first", "/second"])]
    #[case(r#"<a href="">Empty</a>"#, vec![""])]
    fn test_extract_links(#[case] html: &str, #[case] expected: Vec<&str>) {
        let links = HtmlParser::new().extract_links(html, &base());
        assert_eq!(links, expected);
    }

    #[test]
    fn test_links_outside_anchors_are_ignored() {
        let html = r#"
            <link href="/style.css" rel="stylesheet">
            <img src="/logo.png">
            <area href="/map">
            <a href="/real">Real</a>
        "#;
        let links = HtmlParser::new().extract_links(html, &base());
        assert_eq!(links, vec!["/real"]);
    }
}
