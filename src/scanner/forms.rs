//! Form submission probe

use super::injector;
use super::probe::{ProbeContext, SurfaceProber};
use crate::browser::{bounded, Script};
use crate::models::ProbeKind;
use async_trait::async_trait;
use tracing::warn;

/// Fills every input with the payload, then natively submits each form
pub struct FormsProber;

#[async_trait]
impl SurfaceProber for FormsProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Forms
    }

    fn name(&self) -> &str {
        "forms"
    }

    fn description(&self) -> &str {
        "Fills all inputs with the payload and submits each form"
    }

    async fn inject(&self, ctx: &ProbeContext<'_>, _index: usize) {
        injector::fill_all_inputs(ctx.page, ctx.engine, ctx.config.timeouts.injection()).await;
    }

    async fn trigger(&self, ctx: &ProbeContext<'_>, index: usize) {
        submit_form(ctx, index).await;
    }
}

/// Native submit of form `index`, shared with the class probe
pub(crate) async fn submit_form(ctx: &ProbeContext<'_>, index: usize) {
    let submitted = bounded(
        ctx.config.timeouts.trigger(),
        ctx.page.evaluate(&Script::SubmitForm(index)),
    )
    .await;
    if let Err(e) = submitted {
        warn!("Error submitting form {}: {}", index, e);
    }
}
