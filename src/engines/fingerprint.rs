//! Template engine fingerprinting
//!
//! An engine is present when its detection probe evaluates to something
//! other than `undefined` in the page's script context.

use super::Engine;
use crate::browser::{bounded, BrowserError, PageDriver, Script};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Evaluates one engine's probe. Every failure reads as "absent".
pub async fn probe(page: &dyn PageDriver, engine: Engine, timeout: Duration) -> bool {
    let expression = engine.signature().detection_probe.to_string();
    let script = Script::ProbeGlobal(expression);

    match bounded(timeout, page.evaluate(&script)).await {
        Ok(Value::Bool(present)) => present,
        Ok(other) => {
            debug!("Probe for {} returned non-boolean {}", engine, other);
            false
        }
        // The probe target is simply not defined on this page
        Err(BrowserError::Reference(_)) => false,
        Err(e) => {
            warn!("Error detecting engine {}: {}", engine, e);
            false
        }
    }
}

/// Probes the catalog in order and returns the first engine present
pub async fn detect(page: &dyn PageDriver, timeout: Duration) -> Option<Engine> {
    for engine in Engine::all() {
        if probe(page, engine, timeout).await {
            info!("Template engine detected: {}", engine);
            return Some(engine);
        }
    }
    info!("No supported template engine detected");
    None
}

/// Checks only the hinted engine's probe
pub async fn confirm(page: &dyn PageDriver, engine: Engine, timeout: Duration) -> bool {
    let confirmed = probe(page, engine, timeout).await;
    debug!("Engine hint {} confirmed: {}", engine, confirmed);
    confirmed
}

/// Hint first, full catalog scan as fallback
pub async fn resolve(
    page: &dyn PageDriver,
    hint: Option<Engine>,
    timeout: Duration,
) -> Option<Engine> {
    if let Some(engine) = hint {
        info!("Checking whether the page uses {}", engine);
        if confirm(page, engine, timeout).await {
            return Some(engine);
        }
        info!("Hinted engine {} not present, probing every engine", engine);
    }
    detect(page, timeout).await
}
