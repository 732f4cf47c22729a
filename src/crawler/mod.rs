//! Same-site link crawler
//!
//! Depth-first expansion from a seed URL over an explicit worklist, driven
//! through the scan's browser page. Each URL is expanded at most once per
//! crawl, so cyclic link graphs terminate regardless of depth.

pub mod scope;

use crate::browser::{bounded, PageDriver, Script};
use crate::models::{ScanConfig, Timeouts};
use scope::CrawlScope;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Pending expansion of one discovered URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlNode {
    pub url: String,
    pub depth_remaining: u32,
}

/// Depth-limited crawler over the scan's page
pub struct LinkCrawler<'a> {
    page: &'a dyn PageDriver,
    max_depth: u32,
    include_subdomains: bool,
    timeouts: Timeouts,
}

impl<'a> LinkCrawler<'a> {
    pub fn new(page: &'a dyn PageDriver, config: &ScanConfig) -> Self {
        Self {
            page,
            max_depth: config.crawl_depth,
            include_subdomains: config.crawl_subdomains,
            timeouts: config.timeouts.clone(),
        }
    }

    /// Crawls from `seed_url` and returns every discovered URL once, in
    /// discovery order, with the seed first
    pub async fn crawl(&self, seed_url: &str) -> Vec<String> {
        let seed = match Url::parse(seed_url) {
            Ok(u) => u,
            Err(e) => {
                warn!("Invalid start URL for crawler: {e}");
                return vec![seed_url.to_string()];
            }
        };
        let Some(scope) = CrawlScope::for_seed(&seed, self.include_subdomains) else {
            warn!("Start URL has no host: {seed}");
            return vec![seed_url.to_string()];
        };

        let seed = seed.to_string();
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::from([seed.clone()]);
        let mut discovered = vec![seed.clone()];
        let mut worklist = vec![CrawlNode {
            url: seed,
            depth_remaining: self.max_depth,
        }];

        while let Some(node) = worklist.pop() {
            if node.depth_remaining == 0 || visited.contains(&node.url) {
                continue;
            }
            visited.insert(node.url.clone());
            info!("Crawling: {} (depth {})", node.url, node.depth_remaining);

            let links = match self.expand(&scope, &node.url).await {
                Some(links) => links,
                None => continue,
            };
            debug!("Found {} in-scope links on {}", links.len(), node.url);

            let mut children = Vec::new();
            for link in links {
                if seen.insert(link.clone()) {
                    discovered.push(link.clone());
                }
                if !visited.contains(&link) {
                    children.push(CrawlNode {
                        url: link,
                        depth_remaining: node.depth_remaining - 1,
                    });
                }
            }
            // Reversed so the first link on the page is expanded first
            worklist.extend(children.into_iter().rev());
        }

        info!("Crawler finished: {} URLs discovered", discovered.len());
        discovered
    }

    /// Loads one page and returns its in-scope links. `None` aborts this
    /// branch only.
    async fn expand(&self, scope: &CrawlScope, url: &str) -> Option<Vec<String>> {
        if let Err(e) = bounded(self.timeouts.navigation(), self.page.navigate(url)).await {
            warn!("Error while crawling {}: {}", url, e);
            return None;
        }

        let hrefs: Vec<String> = match bounded(
            self.timeouts.enumeration(),
            self.page.evaluate(&Script::AnchorHrefs),
        )
        .await
        {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(e) => {
                warn!("Could not list links on {}: {}", url, e);
                return None;
            }
        };

        // Relative links resolve against where the browser actually landed
        let landed = bounded(self.timeouts.navigation(), self.page.current_url())
            .await
            .ok()
            .and_then(|u| Url::parse(&u).ok());
        let base = landed.or_else(|| Url::parse(url).ok())?;

        Some(scope::collect_links(scope, &base, &hrefs))
    }
}

