//! Crawl scope and link normalization

use std::collections::HashSet;
use url::Url;

/// Host filter for discovered links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    domain: String,
    include_subdomains: bool,
}

impl CrawlScope {
    pub fn new(domain: impl Into<String>, include_subdomains: bool) -> Self {
        Self {
            domain: domain.into().to_ascii_lowercase(),
            include_subdomains,
        }
    }

    /// Scope rooted at the seed's host, `None` for host-less URLs
    pub fn for_seed(seed: &Url, include_subdomains: bool) -> Option<Self> {
        seed.host_str()
            .map(|host| Self::new(host, include_subdomains))
    }

    /// Exact host or its `www.` form; with subdomains, any `*.domain` too
    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if host == self.domain || host == format!("www.{}", self.domain) {
            return true;
        }
        self.include_subdomains && host.ends_with(&format!(".{}", self.domain))
    }

    pub fn allows(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| self.allows_host(host))
    }
}

/// Drops the query string and fragment of a raw href
pub fn strip_query_and_fragment(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

/// Resolves `href` against the page it was found on
pub fn normalize_link(base: &Url, href: &str) -> Option<Url> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut resolved = base.join(trimmed).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_query(None);
    resolved.set_fragment(None);
    Some(resolved)
}

/// In-scope, deduplicated links of one page, in document order
pub fn collect_links(scope: &CrawlScope, base: &Url, hrefs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    hrefs
        .iter()
        .map(|href| strip_query_and_fragment(href))
        .filter_map(|href| normalize_link(base, href))
        .filter(|url| scope.allows(url))
        .map(String::from)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Same URL with the host toggled between bare and `www.`-prefixed
pub fn toggle_www(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_string();
    let toggled = match host.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => format!("www.{host}"),
    };
    url.set_host(Some(&toggled)).ok()?;
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/shop/").expect("valid url")
    }

    #[test]
    fn test_scope_without_subdomains() {
        let scope = CrawlScope::new("example.com", false);
        assert!(scope.allows_host("example.com"));
        assert!(scope.allows_host("www.example.com"));
        assert!(!scope.allows_host("shop.example.com"));
        assert!(!scope.allows_host("example.com.evil.net"));
    }

    #[test]
    fn test_scope_with_subdomains() {
        let scope = CrawlScope::new("example.com", true);
        assert!(scope.allows_host("shop.example.com"));
        assert!(scope.allows_host("a.b.example.com"));
        assert!(!scope.allows_host("example.com.evil.net"));
        assert!(!scope.allows_host("notexample.com"));
    }

    #[test]
    fn test_strip_query_and_fragment() {
        assert_eq!(strip_query_and_fragment("/a?b=1#c"), "/a");
        assert_eq!(strip_query_and_fragment("/a#c?d"), "/a");
        assert_eq!(strip_query_and_fragment("/plain"), "/plain");
    }

    #[test]
    fn test_collect_links_filters_and_dedups() {
        let scope = CrawlScope::new("example.com", false);
        let hrefs = vec![
            "https://example.com/about?x=1".to_string(),
            "https://example.com/about#team".to_string(),
            "/contact".to_string(),
            "https://shop.example.com/cart".to_string(),
            "https://example.com.evil.net/".to_string(),
            "mailto:someone@example.com".to_string(),
            "".to_string(),
        ];
        let links = collect_links(&scope, &base(), &hrefs);
        assert_eq!(
            links,
            vec![
                "https://example.com/about".to_string(),
                "https://example.com/contact".to_string(),
            ]
        );
    }

    #[test]
    fn test_toggle_www() {
        assert_eq!(
            toggle_www("https://example.com/path?q=1").as_deref(),
            Some("https://www.example.com/path?q=1")
        );
        assert_eq!(
            toggle_www("https://www.example.com/").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(toggle_www("not a url"), None);
    }
}
