//! Reflection oracle
//!
//! Decides whether an injected payload was evaluated by looking at the
//! page's rendered markup. Both checks fail closed: a timeout or script
//! error is "not reflected".

use super::Engine;
use crate::browser::{bounded, PageDriver, Script};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Random marker written into inputs for the class reflection check
pub const CLASS_MARKER: &str = "uoihpojskx";

/// Whether `engine`'s evaluated payload appears in `markup`
pub fn markup_reflects(markup: &str, engine: Engine) -> bool {
    engine.signature().reflection.regex().is_match(markup)
}

/// Whether any class attribute value contains the class marker
pub fn classes_reflect(classes: &[String]) -> bool {
    classes.iter().any(|c| c.contains(CLASS_MARKER))
}

/// Checks the current document for the evaluated form of `engine`'s payload
pub async fn has_reflection(page: &dyn PageDriver, engine: Engine, timeout: Duration) -> bool {
    let markup = match bounded(timeout, page.evaluate(&Script::OuterHtml)).await {
        Ok(Value::String(html)) => html,
        Ok(other) => {
            warn!("Unexpected markup value: {}", other);
            return false;
        }
        Err(e) => {
            warn!("Reflection check failed: {}", e);
            return false;
        }
    };

    let reflected = markup_reflects(&markup, engine);
    if reflected {
        let location = bounded(timeout, page.current_url()).await.unwrap_or_default();
        info!("Vulnerability detected at: {}", location);
    }
    reflected
}

/// Checks every element's class attribute for [`CLASS_MARKER`]
pub async fn has_class_reflection(page: &dyn PageDriver, timeout: Duration) -> bool {
    let classes: Vec<String> = match bounded(timeout, page.evaluate(&Script::ClassValues)).await
    {
        Ok(value) => match serde_json::from_value(value) {
            Ok(classes) => classes,
            Err(e) => {
                warn!("Unexpected class list: {}", e);
                return false;
            }
        },
        Err(e) => {
            warn!("Class reflection check failed: {}", e);
            return false;
        }
    };

    let reflected = classes_reflect(&classes);
    if reflected {
        let location = bounded(timeout, page.current_url()).await.unwrap_or_default();
        info!("Class-based reflection detected at: {}", location);
    }
    reflected
}
