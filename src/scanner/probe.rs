//! Shared surface probing state machine
//!
//! Every prober walks the same loop per instance:
//! enumerate, inject, trigger, await navigation, check reflection, restore.
//! The surface count is re-read before every instance because the previous
//! iteration may have mutated or replaced the document.

use crate::browser::{bounded, BrowserError, PageDriver};
use crate::engines::reflection;
use crate::engines::Engine;
use crate::models::{Finding, NavigationOutcome, ProbeKind, ScanConfig};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Immutable per-page state threaded through every prober
pub struct ProbeContext<'a> {
    pub page: &'a dyn PageDriver,
    pub engine: Engine,
    /// URL the page is returned to after every instance
    pub baseline_url: String,
    pub config: &'a ScanConfig,
}

/// Outcome of one prober over one page
#[derive(Debug, Clone)]
pub struct SurfaceOutcome {
    pub probe: ProbeKind,
    pub vulnerable: bool,
    pub findings: Vec<Finding>,
}

impl SurfaceOutcome {
    fn clean(probe: ProbeKind) -> Self {
        Self {
            probe,
            vulnerable: false,
            findings: Vec::new(),
        }
    }
}

/// One kind of injectable surface
#[async_trait]
pub trait SurfaceProber: Send + Sync {
    fn kind(&self) -> ProbeKind;

    /// Short name used in logs and `--list` output
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Engine recorded on findings
    fn finding_engine(&self, ctx: &ProbeContext<'_>) -> Option<Engine> {
        Some(ctx.engine)
    }

    /// String planted into the page, recorded on findings
    fn planted(&self, ctx: &ProbeContext<'_>) -> String {
        ctx.engine.payload().to_string()
    }

    /// Writes the payload for instance `index`. Failures are logged by the
    /// injection driver and never stop the loop.
    async fn inject(&self, ctx: &ProbeContext<'_>, index: usize);

    /// Fires instance `index` (submit, key press, click)
    async fn trigger(&self, ctx: &ProbeContext<'_>, index: usize);

    /// Whether the page now shows evaluated input
    async fn check(&self, ctx: &ProbeContext<'_>) -> bool {
        reflection::has_reflection(ctx.page, ctx.engine, ctx.config.timeouts.reflection()).await
    }

    /// Reload when the trigger caused no navigation
    fn reload_without_navigation(&self) -> bool {
        false
    }
}

/// Runs `prober` over every instance of its surface on the current page
pub async fn run_probe(prober: &dyn SurfaceProber, ctx: &ProbeContext<'_>) -> SurfaceOutcome {
    let kind = prober.kind();
    let surface = kind.surface();
    let timeouts = &ctx.config.timeouts;
    let mut outcome = SurfaceOutcome::clean(kind);

    let total = match bounded(timeouts.enumeration(), ctx.page.count(surface.selector())).await {
        Ok(n) => n,
        Err(e) => {
            warn!("Error getting {} elements: {}", surface, e);
            return outcome;
        }
    };
    info!("Found {} {} element(s) for {} probe", total, surface, prober.name());

    for index in 0..total {
        // Required re-read: the previous instance may have changed the DOM
        match bounded(timeouts.enumeration(), ctx.page.count(surface.selector())).await {
            Ok(current) if index < current => {}
            Ok(current) => {
                debug!("{} {} is gone ({} left), skipping", surface, index, current);
                continue;
            }
            Err(e) => {
                warn!("Error re-reading {} elements: {}", surface, e);
                continue;
            }
        }
        debug!("{} probe: instance {}/{}", prober.name(), index + 1, total);

        if let Err(e) = bounded(timeouts.injection(), ctx.page.arm_navigation()).await {
            debug!("Could not arm navigation marker: {}", e);
        }
        prober.inject(ctx, index).await;
        prober.trigger(ctx, index).await;
        let navigation = await_navigation(ctx).await;
        debug!("Navigation after trigger: {:?}", navigation);

        if prober.check(ctx).await {
            let observed_url = bounded(timeouts.navigation(), ctx.page.current_url())
                .await
                .ok();
            outcome.vulnerable = true;
            outcome.findings.push(Finding {
                page_url: ctx.baseline_url.clone(),
                probe: kind,
                index,
                engine: prober.finding_engine(ctx),
                payload: prober.planted(ctx),
                observed_url,
            });
            if !ctx.config.continue_when_positive {
                info!("Vulnerability found in {} - stopping", prober.name());
                return outcome;
            }
            info!("Vulnerability found in {} - continuing", prober.name());
        }

        restore(prober, ctx, navigation).await;
    }

    outcome
}

/// Classifies what the trigger did to the document
pub async fn await_navigation(ctx: &ProbeContext<'_>) -> NavigationOutcome {
    let window = ctx.config.timeouts.post_trigger_navigation();
    match bounded(window, ctx.page.wait_for_navigation()).await {
        Ok(()) => NavigationOutcome::Navigated,
        Err(BrowserError::Timeout(_)) => NavigationOutcome::TimedOut,
        Err(e) => {
            debug!("Navigation wait failed: {}", e);
            NavigationOutcome::NoNavigation
        }
    }
}

/// Puts the page back on the baseline URL
async fn restore(prober: &dyn SurfaceProber, ctx: &ProbeContext<'_>, navigation: NavigationOutcome) {
    let timeouts = &ctx.config.timeouts;

    if navigation.navigated() {
        if let Err(e) = bounded(timeouts.history(), ctx.page.go_back()).await {
            warn!("Error going back: {}", e);
        }
    } else if prober.reload_without_navigation() {
        if let Err(e) = bounded(timeouts.history(), ctx.page.reload()).await {
            warn!("Error reloading page: {}", e);
        }
    }

    let current = bounded(timeouts.navigation(), ctx.page.current_url()).await;
    if matches!(&current, Ok(url) if *url == ctx.baseline_url) {
        return;
    }
    debug!("Returning to baseline {}", ctx.baseline_url);
    if let Err(e) = bounded(timeouts.navigation(), ctx.page.navigate(&ctx.baseline_url)).await {
        warn!("Error returning to {}: {}", ctx.baseline_url, e);
    }
}
