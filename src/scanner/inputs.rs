//! Per-input Enter key probe

use super::injector;
use super::probe::{ProbeContext, SurfaceProber};
use crate::browser::{bounded, ElementRef};
use crate::models::{ProbeKind, SurfaceKind};
use async_trait::async_trait;
use tracing::warn;

/// Types the payload into one input at a time and presses Enter
pub struct InputsProber;

#[async_trait]
impl SurfaceProber for InputsProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Inputs
    }

    fn name(&self) -> &str {
        "inputs"
    }

    fn description(&self) -> &str {
        "Types the payload into each input and presses Enter"
    }

    async fn inject(&self, ctx: &ProbeContext<'_>, index: usize) {
        let input = ElementRef::new(SurfaceKind::Input, index);
        injector::type_into_input(ctx.page, ctx.engine, input, ctx.config.timeouts.injection())
            .await;
    }

    async fn trigger(&self, ctx: &ProbeContext<'_>, index: usize) {
        let input = ElementRef::new(SurfaceKind::Input, index);
        if let Err(e) = bounded(
            ctx.config.timeouts.trigger(),
            ctx.page.press_key(input, "Enter"),
        )
        .await
        {
            warn!("Error pressing Enter on input {}: {}", index, e);
        }
    }
}
