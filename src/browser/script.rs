//! Page-context scripts used by the scanner
//!
//! Scripts are a closed set so that drivers other than a real browser can
//! interpret them directly. [`Script::source`] renders the JavaScript a real
//! browser runs; the body is wrapped in an envelope that reports exceptions
//! as data, which [`unwrap_envelope`] turns back into [`BrowserError`]s.

use super::{BrowserError, BrowserResult, ElementRef};
use serde_json::Value;

/// Global set on a document before a trigger; its absence afterwards means
/// the document was replaced
pub const NAVIGATION_MARKER: &str = "__cstiNavigationMarker";

/// Appended to payloads written into `type=email` inputs
pub const EMAIL_SUFFIX: &str = "@test.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// `true` when the expression evaluates to something defined
    ProbeGlobal(String),
    /// Full rendered markup of the document
    OuterHtml,
    /// Non-empty class attribute values of every element
    ClassValues,
    /// Writes `value` into every settable input, returns how many were set
    FillInputs { value: String },
    /// Replaces every query value of the Nth anchor's href and clicks it
    InjectLinkQuery { index: usize, payload: String },
    /// Native submit of the Nth form, bypassing overridden `submit` members
    SubmitForm(usize),
    /// DOM click on one element
    Click(ElementRef),
    /// Moves keyboard focus to one element without activating it
    Focus(ElementRef),
    /// Resolved `href` of every anchor
    AnchorHrefs,
    /// Length of `querySelectorAll(selector)`
    Count(String),
    ArmNavigation,
    NavigationArmed,
}

fn js_string(value: &str) -> String {
    // serde_json string escaping is a valid JS string literal
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

impl Script {
    /// Statement-form body; must `return` its result
    fn body(&self) -> String {
        match self {
            Script::ProbeGlobal(expression) => format!(
                "return typeof window.eval({}) !== 'undefined';",
                js_string(expression)
            ),
            Script::OuterHtml => "return document.documentElement.outerHTML;".to_string(),
            Script::ClassValues => r#"
                return Array.from(document.querySelectorAll('*'))
                    .map(el => (el.classList && el.classList.value) || '')
                    .filter(v => v.length > 0);
            "#
            .to_string(),
            Script::FillInputs { value } => format!(
                r#"
                const payload = {payload};
                const suffix = {suffix};
                let filled = 0;
                for (const input of document.querySelectorAll('input')) {{
                    if (input.type === 'file' || input.type === 'submit') {{
                        continue;
                    }}
                    input.value = input.type === 'email' ? payload + suffix : payload;
                    filled += 1;
                }}
                return filled;
                "#,
                payload = js_string(value),
                suffix = js_string(EMAIL_SUFFIX),
            ),
            Script::InjectLinkQuery { index, payload } => format!(
                r#"
                const anchor = document.querySelectorAll('a')[{index}];
                if (!anchor) {{
                    return false;
                }}
                const target = new URL(anchor.href);
                for (const key of Array.from(target.searchParams.keys())) {{
                    target.searchParams.set(key, {payload});
                }}
                anchor.href = target.toString();
                anchor.click();
                return true;
                "#,
                payload = js_string(payload),
            ),
            Script::SubmitForm(index) => format!(
                r#"
                const form = document.querySelectorAll('form')[{index}];
                if (!form) {{
                    throw new RangeError('form {index} is gone');
                }}
                HTMLFormElement.prototype.submit.call(form);
                return true;
                "#
            ),
            Script::Click(element) => format!(
                r#"
                const el = document.querySelectorAll({selector})[{index}];
                if (!el) {{
                    throw new RangeError('element {index} is gone');
                }}
                el.click();
                return true;
                "#,
                selector = js_string(element.surface.selector()),
                index = element.index,
            ),
            Script::Focus(element) => format!(
                r#"
                const el = document.querySelectorAll({selector})[{index}];
                if (!el) {{
                    throw new RangeError('element {index} is gone');
                }}
                el.focus();
                return document.activeElement === el;
                "#,
                selector = js_string(element.surface.selector()),
                index = element.index,
            ),
            Script::AnchorHrefs => {
                "return Array.from(document.querySelectorAll('a')).map(a => a.href || '');"
                    .to_string()
            }
            Script::Count(selector) => format!(
                "return document.querySelectorAll({}).length;",
                js_string(selector)
            ),
            Script::ArmNavigation => format!("window.{NAVIGATION_MARKER} = true; return true;"),
            Script::NavigationArmed => {
                format!("return window.{NAVIGATION_MARKER} === true;")
            }
        }
    }

    /// JavaScript expression evaluating to the result envelope
    pub fn source(&self) -> String {
        format!(
            "(() => {{ try {{ return {{ ok: true, value: (() => {{ {body} }})() }}; }} \
             catch (e) {{ return {{ ok: false, name: String((e && e.name) || 'Error'), \
             message: String((e && e.message) || e) }}; }} }})()",
            body = self.body()
        )
    }
}

/// Converts an evaluated envelope into the script's value or error
pub fn unwrap_envelope(envelope: Value) -> BrowserResult<Value> {
    let ok = envelope.get("ok").and_then(Value::as_bool);
    match ok {
        Some(true) => Ok(envelope.get("value").cloned().unwrap_or(Value::Null)),
        Some(false) => {
            let name = envelope
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Error");
            let message = envelope
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if name == "ReferenceError" {
                Err(BrowserError::Reference(message))
            } else {
                Err(BrowserError::Script(format!("{name}: {message}")))
            }
        }
        None => Err(BrowserError::Protocol(format!(
            "unexpected script result: {envelope}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SurfaceKind;
    use serde_json::json;

    #[test]
    fn test_probe_script_escapes_expression() {
        let src = Script::ProbeGlobal("angular.version".to_string()).source();
        assert!(src.contains(r#"window.eval("angular.version")"#));
        assert!(src.contains("catch (e)"));
    }

    #[test]
    fn test_fill_inputs_quotes_payload() {
        let src = Script::FillInputs {
            value: r#"{{js "12345*54321"}}"#.to_string(),
        }
        .source();
        assert!(src.contains(r#""{{js \"12345*54321\"}}""#));
        assert!(src.contains("\"@test.com\""));
        assert!(src.contains("input.type === 'file'"));
    }

    #[test]
    fn test_click_uses_surface_selector() {
        let src = Script::Click(ElementRef::new(SurfaceKind::Button, 3)).source();
        assert!(src.contains(r#"querySelectorAll("button")[3]"#));
    }

    #[test]
    fn test_focus_does_not_activate_element() {
        // A click would submit or reset the form on submit/reset inputs
        let src = Script::Focus(ElementRef::new(SurfaceKind::Input, 2)).source();
        assert!(src.contains(r#"querySelectorAll("input")[2]"#));
        assert!(src.contains("el.focus();"));
        assert!(!src.contains(".click()"));
    }

    #[test]
    fn test_unwrap_envelope_value() {
        let value = unwrap_envelope(json!({"ok": true, "value": 42})).expect("ok envelope");
        assert_eq!(value, json!(42));
        let missing = unwrap_envelope(json!({"ok": true})).expect("undefined value");
        assert_eq!(missing, Value::Null);
    }

    #[test]
    fn test_unwrap_envelope_errors() {
        let reference = unwrap_envelope(json!({
            "ok": false, "name": "ReferenceError", "message": "Vue is not defined"
        }));
        assert_eq!(
            reference,
            Err(BrowserError::Reference("Vue is not defined".to_string()))
        );

        let other = unwrap_envelope(json!({"ok": false, "name": "TypeError", "message": "x"}));
        assert!(matches!(other, Err(BrowserError::Script(_))));

        let garbage = unwrap_envelope(json!("nope"));
        assert!(matches!(garbage, Err(BrowserError::Protocol(_))));
    }
}
