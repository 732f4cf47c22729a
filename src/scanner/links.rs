//! Anchor query string probe

use super::injector;
use super::probe::{ProbeContext, SurfaceProber};
use crate::models::ProbeKind;
use async_trait::async_trait;

/// Fills inputs, rewrites the anchor's query values to the payload and
/// follows it. The click happens during injection.
pub struct LinksProber;

#[async_trait]
impl SurfaceProber for LinksProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Links
    }

    fn name(&self) -> &str {
        "links"
    }

    fn description(&self) -> &str {
        "Rewrites each link's query parameters to the payload and follows it"
    }

    async fn inject(&self, ctx: &ProbeContext<'_>, index: usize) {
        let timeout = ctx.config.timeouts.injection();
        injector::fill_all_inputs(ctx.page, ctx.engine, timeout).await;
        injector::inject_into_link_query(ctx.page, ctx.engine, index, timeout).await;
    }

    async fn trigger(&self, _ctx: &ProbeContext<'_>, _index: usize) {}

    fn reload_without_navigation(&self) -> bool {
        true
    }
}
