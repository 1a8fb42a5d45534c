// src/crawl/domain.rs
// =============================================================================
// Keeps the crawl inside the seed's registrable domain.
//
// "Registrable domain" is the public-suffix-aware top private domain:
//   www.google.com   -> google.com
//   maps.google.co.uk -> google.co.uk
//   notgoogle.com    -> notgoogle.com
//
// Hosts that have no registrable domain (IP literals, `localhost`, a bare
// public suffix) are compared by their full host instead.
// =============================================================================

use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    domain: String,
}

impl DomainScope {
    /// The scope of a seed URL, or None when the URL has no host.
    pub fn of(seed: &Url) -> Option<Self> {
        registrable_domain(seed).map(|domain| Self { domain })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn contains(&self, url: &Url) -> bool {
        registrable_domain(url).is_some_and(|d| d == self.domain)
    }
}

pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(host) => {
            let host = host.trim_end_matches('.').to_ascii_lowercase();
            let registrable = psl::domain_str(&host).map(str::to_string);
            Some(registrable.unwrap_or(host))
        }
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[rstest]
    #[case("https://www.google.com/", Some("google.com"))]
    #[case("https://google.com/search?q=x", Some("google.com"))]
    #[case("https://a.b.c.google.com/", Some("google.com"))]
    #[case("https://maps.google.co.uk/", Some("google.co.uk"))]
    #[case("https://WWW.Google.COM./", Some("google.com"))]
    #[case("http://127.0.0.1:8080/", Some("127.0.0.1"))]
    #[case("http://[::1]/", Some("::1"))]
    #[case("http://localhost:3000/", Some("localhost"))]
    #[case("mailto:someone@example.com", None)]
    fn test_registrable_domain(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(registrable_domain(&url(input)).as_deref(), expected);
    }

    #[test]
    fn test_subdomains_are_in_scope() {
        let scope = DomainScope::of(&url("https://www.google.com")).unwrap();
        assert_eq!(scope.domain(), "google.com");
        assert!(scope.contains(&url("https://sub.google.com/page")));
        assert!(scope.contains(&url("http://google.com:8080/")));
    }

    #[test]
    fn test_lookalike_domains_are_out_of_scope() {
        let scope = DomainScope::of(&url("https://www.google.com")).unwrap();
        assert!(!scope.contains(&url("https://notgoogle.com/")));
        assert!(!scope.contains(&url("https://google.com.evil.net/")));
        assert!(!scope.contains(&url("https://google.co.uk/")));
    }

    #[test]
    fn test_ip_scope_matches_same_ip_only() {
        let scope = DomainScope::of(&url("http://127.0.0.1:4000/")).unwrap();
        assert!(scope.contains(&url("http://127.0.0.1:5000/other")));
        assert!(!scope.contains(&url("http://127.0.0.2:4000/")));
    }

    #[test]
    fn test_seed_without_host_has_no_scope() {
        assert!(DomainScope::of(&url("data:text/plain,hi")).is_none());
    }
}
