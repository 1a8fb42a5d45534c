// src/extract/mod.rs
// =============================================================================
// The document parser boundary.
//
// The crawler hands a page's HTML and its final URL to a DocumentParser and
// gets back the raw href values found on the page. Resolving, filtering and
// normalizing those hrefs is the scheduler's job, not the parser's.
//
// Submodules:
// - html: HtmlParser, built on the `scraper` crate
// =============================================================================

mod html;

pub use html::HtmlParser;

use url::Url;

pub trait DocumentParser: Send + Sync {
    /// Returns the raw `href` of every anchor on the page, in document order.
    /// `base` is available for parsers that need it (e.g. to honour
    /// `<base href>`); resolution itself happens in the caller.
    fn extract_links(&self, html: &str, base: &Url) -> Vec<String>;
}

// Resolves one href against the page URL.
//
// Returns None for anything that isn't an absolute http(s) URL afterwards:
// mailto:, tel:, javascript:, data:, and hrefs that fail to parse at all.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let url = base.join(href.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://other.com", Some("https://other.com/"))]
    #[case("/docs", Some("https://example.com/docs"))]
    #[case("../about", Some("https://example.com/about"))]
    #[case("  child  ", Some("https://example.com/page/child"))]
    #[case("#section", Some("https://example.com/page/#section"))]
    #[case("?q=1", Some("https://example.com/page/?q=1"))]
    #[case("//cdn.example.com/x", Some("https://cdn.example.com/x"))]
    #[case("mailto:test@example.com", None)]
    #[case("tel:+123", None)]
    #[case("javascript:void(0)", None)]
    #[case("data:text/plain,hi", None)]
    #[case("ftp://example.com/file", None)]
    #[case("http://[::1]:namedport", None)]
    fn test_resolve_link(#[case] href: &str, #[case] expected: Option<&str>) {
        let base = Url::parse("https://example.com/page/").unwrap();
        let resolved = resolve_link(&base, href);
        assert_eq!(resolved.as_ref().map(Url::as_str), expected);
    }
}
