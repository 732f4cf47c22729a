//! Class attribute reflection probe
//!
//! Engine independent: plants a fixed marker through every form and looks
//! for it in element class attributes.

use super::forms::submit_form;
use super::injector::{self, MarkerTechnique};
use super::probe::{ProbeContext, SurfaceProber};
use crate::engines::reflection::{self, CLASS_MARKER};
use crate::engines::Engine;
use crate::models::ProbeKind;
use async_trait::async_trait;

pub struct ClassReflectionProber {
    technique: MarkerTechnique,
}

impl ClassReflectionProber {
    pub fn new(technique: MarkerTechnique) -> Self {
        Self { technique }
    }
}

impl Default for ClassReflectionProber {
    fn default() -> Self {
        Self::new(MarkerTechnique::default())
    }
}

#[async_trait]
impl SurfaceProber for ClassReflectionProber {
    fn kind(&self) -> ProbeKind {
        ProbeKind::ClassReflection
    }

    fn name(&self) -> &str {
        "class"
    }

    fn description(&self) -> &str {
        "Submits a marker through each form and looks for it in class attributes"
    }

    fn finding_engine(&self, _ctx: &ProbeContext<'_>) -> Option<Engine> {
        None
    }

    fn planted(&self, _ctx: &ProbeContext<'_>) -> String {
        CLASS_MARKER.to_string()
    }

    async fn inject(&self, ctx: &ProbeContext<'_>, _index: usize) {
        injector::fill_with_marker(ctx.page, self.technique, ctx.config.timeouts.injection())
            .await;
    }

    async fn trigger(&self, ctx: &ProbeContext<'_>, index: usize) {
        submit_form(ctx, index).await;
    }

    async fn check(&self, ctx: &ProbeContext<'_>) -> bool {
        reflection::has_class_reflection(ctx.page, ctx.config.timeouts.reflection()).await
    }
}
