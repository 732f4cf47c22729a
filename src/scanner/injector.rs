//! Payload injection primitives
//!
//! Each primitive is bounded and fail-soft: errors are logged and reported
//! as `false`, never propagated.

use crate::browser::{bounded, ElementRef, PageDriver, Script};
use crate::engines::reflection::CLASS_MARKER;
use crate::engines::Engine;
use std::time::Duration;
use tracing::{debug, warn};

/// How the class reflection marker is planted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerTechnique {
    /// Written as the value of every settable input
    #[default]
    InputValues,
}

async fn fill_inputs(page: &dyn PageDriver, value: &str, timeout: Duration) -> bool {
    let script = Script::FillInputs {
        value: value.to_string(),
    };
    match bounded(timeout, page.evaluate(&script)).await {
        Ok(filled) => {
            debug!("Filled {} input(s) with {}", filled, value);
            true
        }
        Err(e) => {
            warn!("Error filling inputs: {}", e);
            false
        }
    }
}

/// Sets every input to the engine payload (file and submit inputs are left
/// alone, email inputs get a mailbox suffix)
pub async fn fill_all_inputs(page: &dyn PageDriver, engine: Engine, timeout: Duration) -> bool {
    debug!("Injecting payload: {}", engine.payload());
    fill_inputs(page, engine.payload(), timeout).await
}

/// Types the payload key by key so input-level handlers fire
pub async fn type_into_input(
    page: &dyn PageDriver,
    engine: Engine,
    input: ElementRef,
    timeout: Duration,
) -> bool {
    match bounded(timeout, page.type_text(input, engine.payload())).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Error typing into input {}: {}", input.index, e);
            false
        }
    }
}

/// Rewrites every query value of the Nth anchor to the payload and clicks it
pub async fn inject_into_link_query(
    page: &dyn PageDriver,
    engine: Engine,
    index: usize,
    timeout: Duration,
) -> bool {
    let script = Script::InjectLinkQuery {
        index,
        payload: engine.payload().to_string(),
    };
    match bounded(timeout, page.evaluate(&script)).await {
        Ok(serde_json::Value::Bool(true)) => true,
        Ok(_) => {
            debug!("Anchor {} is gone", index);
            false
        }
        Err(e) => {
            warn!("Error injecting link {}: {}", index, e);
            false
        }
    }
}

/// Fills inputs with the class reflection marker
pub async fn fill_with_marker(
    page: &dyn PageDriver,
    technique: MarkerTechnique,
    timeout: Duration,
) -> bool {
    match technique {
        MarkerTechnique::InputValues => {
            debug!("Injecting class marker");
            fill_inputs(page, CLASS_MARKER, timeout).await
        }
    }
}
