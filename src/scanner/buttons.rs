//! Button click probe

use super::injector;
use super::probe::{ProbeContext, SurfaceProber};
use crate::browser::{bounded, ElementRef};
use crate::models::{ProbeKind, SurfaceKind};
use async_trait::async_trait;
use tracing::warn;

/// Fills every input with the payload, then clicks each button
pub struct ButtonsProber;

#[async_trait]
impl SurfaceProber for ButtonsProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Buttons
    }

    fn name(&self) -> &str {
        "buttons"
    }

    fn description(&self) -> &str {
        "Fills all inputs with the payload and clicks each button"
    }

    async fn inject(&self, ctx: &ProbeContext<'_>, _index: usize) {
        injector::fill_all_inputs(ctx.page, ctx.engine, ctx.config.timeouts.injection()).await;
    }

    async fn trigger(&self, ctx: &ProbeContext<'_>, index: usize) {
        let button = ElementRef::new(SurfaceKind::Button, index);
        if let Err(e) = bounded(ctx.config.timeouts.trigger(), ctx.page.click(button)).await {
            warn!("Error clicking button {}: {}", index, e);
        }
    }

    fn reload_without_navigation(&self) -> bool {
        true
    }
}
