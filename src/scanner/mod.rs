//! Scan orchestration and surface prober registry

pub mod buttons;
pub mod class;
pub mod forms;
pub mod injector;
pub mod inputs;
pub mod links;
pub mod probe;

use crate::browser::{bounded, PageDriver};
use crate::crawler::scope::toggle_www;
use crate::crawler::LinkCrawler;
use crate::engines::{self, fingerprint, Engine};
use crate::error::{CstiError, Result};
use crate::models::{PageVerdict, ScanConfig, ScanReport};
use indicatif::{ProgressBar, ProgressStyle};
use probe::{ProbeContext, SurfaceProber};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives one scan: target, engine, probers, then optionally crawled pages
pub struct ScanEngine {
    probers: Vec<Arc<dyn SurfaceProber>>,
}

impl ScanEngine {
    /// Creates a ScanEngine with no registered probers
    pub fn new() -> Self {
        Self {
            probers: Vec::new(),
        }
    }

    /// Creates a ScanEngine with every prober registered in scan order
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register(Arc::new(forms::FormsProber));
        engine.register(Arc::new(inputs::InputsProber));
        engine.register(Arc::new(buttons::ButtonsProber));
        engine.register(Arc::new(links::LinksProber));
        engine.register(Arc::new(class::ClassReflectionProber::default()));
        engine
    }

    /// Registers a prober; probers run in registration order
    pub fn register(&mut self, prober: Arc<dyn SurfaceProber>) {
        self.probers.push(prober);
    }

    /// Returns name and description of every registered prober
    pub fn list_probes(&self) -> Vec<(&str, &str)> {
        self.probers
            .iter()
            .map(|p| (p.name(), p.description()))
            .collect()
    }

    /// Runs the full scan on `page`
    ///
    /// Only an unreachable initial target is fatal. Every later failure is
    /// recorded on the affected page's verdict.
    pub async fn run(&self, page: &dyn PageDriver, config: &ScanConfig) -> Result<ScanReport> {
        engines::validate()?;

        let target = self.establish(page, config).await?;
        let mut report = ScanReport::new(&target);

        let engine = fingerprint::resolve(page, config.engine_hint, config.timeouts.probe()).await;
        let verdict = match engine {
            Some(engine) => self.scan_page(page, &target, engine, config).await,
            None => {
                warn!("Unknown template engine on {}, skipping page", target);
                PageVerdict::skipped(&target, None, "no supported template engine detected")
            }
        };
        let stop = verdict.vulnerable && !config.continue_when_positive;
        report.push(verdict);

        if stop {
            info!("Vulnerability found on {} - stopping scan", target);
        } else if config.crawl {
            self.scan_crawled(page, &target, config, &mut report).await;
        }

        report.finish();
        Ok(report)
    }

    /// Loads the target, retrying once with the `www.` host toggled
    async fn establish(&self, page: &dyn PageDriver, config: &ScanConfig) -> Result<String> {
        load(page, &config.target, config)
            .await
            .map_err(CstiError::TargetUnreachable)
    }

    /// Runs every enabled prober against the page currently loaded
    pub async fn scan_page(
        &self,
        page: &dyn PageDriver,
        url: &str,
        engine: Engine,
        config: &ScanConfig,
    ) -> PageVerdict {
        if engine.signature().inert_payload {
            warn!(
                "Payload for {} is a literal marker, not an expression; verify positives manually",
                engine
            );
        }

        let baseline_url = bounded(config.timeouts.navigation(), page.current_url())
            .await
            .unwrap_or_else(|_| url.to_string());
        let ctx = ProbeContext {
            page,
            engine,
            baseline_url,
            config,
        };
        let mut verdict = PageVerdict::scanned(url, engine);

        for prober in &self.probers {
            let kind = prober.kind();
            if !config.probe_enabled(kind) {
                debug!("Skipping {} probe", prober.name());
                continue;
            }
            info!("Checking {} on {}", prober.name(), ctx.baseline_url);

            let outcome = probe::run_probe(prober.as_ref(), &ctx).await;
            let hit = outcome.vulnerable;
            verdict.record(kind, hit, outcome.findings);

            if hit && !config.continue_when_positive {
                break;
            }
        }

        verdict
    }

    /// Scans every crawled page after the seed
    async fn scan_crawled(
        &self,
        page: &dyn PageDriver,
        target: &str,
        config: &ScanConfig,
        report: &mut ScanReport,
    ) {
        info!("Starting crawler on {}", target);
        let discovered = LinkCrawler::new(page, config).crawl(target).await;
        let pending: Vec<String> = discovered.into_iter().skip(1).collect();
        info!("Crawler discovered {} additional page(s)", pending.len());

        let pb = ProgressBar::new(pending.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        for url in pending {
            pb.set_message(url.clone());
            let verdict = self.scan_discovered(page, &url, config).await;
            let stop = verdict.vulnerable && !config.continue_when_positive;
            report.push(verdict);
            pb.inc(1);

            if stop {
                info!("Vulnerability found on {} - stopping scan", url);
                break;
            }
        }

        pb.finish_with_message("Crawl scan complete");
    }

    async fn scan_discovered(
        &self,
        page: &dyn PageDriver,
        url: &str,
        config: &ScanConfig,
    ) -> PageVerdict {
        let landed = match load(page, url, config).await {
            Ok(landed) => landed,
            Err(reason) => return PageVerdict::unreachable(url, reason),
        };

        // Pages on one site may use different engines
        match fingerprint::detect(page, config.timeouts.probe()).await {
            Some(engine) => self.scan_page(page, &landed, engine, config).await,
            None => {
                info!("Unknown template engine on {}, skipping", landed);
                PageVerdict::skipped(&landed, None, "no supported template engine detected")
            }
        }
    }
}

/// Navigates to `url`, retrying once with the `www.` host toggled. Returns
/// the URL that loaded, or why neither form did.
async fn load(
    page: &dyn PageDriver,
    url: &str,
    config: &ScanConfig,
) -> std::result::Result<String, String> {
    info!("Visiting: {}", url);
    let first = match bounded(config.timeouts.navigation(), page.navigate(url)).await {
        Ok(()) => return Ok(url.to_string()),
        Err(e) => e,
    };
    warn!("Error loading {}: {}", url, first);

    let Some(alternate) = toggle_www(url) else {
        return Err(format!("{url}: {first}"));
    };
    info!("Retrying with {}", alternate);
    match bounded(config.timeouts.navigation(), page.navigate(&alternate)).await {
        Ok(()) => Ok(alternate),
        Err(e) => {
            warn!("Error loading {}: {}", alternate, e);
            Err(format!("{url} ({first}), {alternate} ({e})"))
        }
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
