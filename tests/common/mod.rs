//! Common test utilities
//!
//! `MockPage` is a scripted in-memory `PageDriver`: a small site of pages
//! keyed by URL, each with globals, markup, surface counts, links and
//! reactions to triggers. Reactions either render the submitted values on
//! the same document or navigate to a results page.

#![allow(dead_code)]

use async_trait::async_trait;
use csti::browser::{BrowserError, BrowserResult, ElementRef, PageDriver, Script};
use csti::models::{ScanConfig, SurfaceKind, Timeouts};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Every deadline in tests, in milliseconds
pub const TEST_TIMEOUT_MS: u64 = 40;

/// Creates a test ScanConfig with short deadlines
pub fn test_config(target: &str) -> ScanConfig {
    ScanConfig {
        target: target.to_string(),
        timeouts: Timeouts::uniform(TEST_TIMEOUT_MS),
        ..Default::default()
    }
}

/// Action that fires a page reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Submit(usize),
    Enter(usize),
    Click(usize),
    Follow(usize),
}

/// How submitted values come back in the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Nothing,
    /// Verbatim, like a page that escapes its output
    Echo,
    /// Through a toy template engine
    Evaluate,
    /// Into class attributes
    ClassEcho,
}

#[derive(Debug, Clone)]
pub struct Effect {
    pub navigate: Option<String>,
    pub render: Render,
    pub remove: Option<SurfaceKind>,
}

impl Effect {
    pub fn render(render: Render) -> Self {
        Self {
            navigate: None,
            render,
            remove: None,
        }
    }

    pub fn navigate_to(url: &str, render: Render) -> Self {
        Self {
            navigate: Some(url.to_string()),
            render,
            remove: None,
        }
    }

    pub fn removing(kind: SurfaceKind) -> Self {
        Self {
            navigate: None,
            render: Render::Nothing,
            remove: Some(kind),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SitePage {
    pub globals: Vec<String>,
    pub body: String,
    pub forms: usize,
    pub inputs: usize,
    pub buttons: usize,
    pub anchors: Vec<String>,
    pub reactions: HashMap<Trigger, Effect>,
}

impl SitePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(mut self, name: &str) -> Self {
        self.globals.push(name.to_string());
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn forms(mut self, n: usize) -> Self {
        self.forms = n;
        self
    }

    pub fn inputs(mut self, n: usize) -> Self {
        self.inputs = n;
        self
    }

    pub fn buttons(mut self, n: usize) -> Self {
        self.buttons = n;
        self
    }

    pub fn link(mut self, href: &str) -> Self {
        self.anchors.push(href.to_string());
        self
    }

    pub fn on(mut self, trigger: Trigger, effect: Effect) -> Self {
        self.reactions.insert(trigger, effect);
        self
    }

    fn count(&self, surface: SurfaceKind) -> usize {
        match surface {
            SurfaceKind::Form => self.forms,
            SurfaceKind::Input => self.inputs,
            SurfaceKind::Button => self.buttons,
            SurfaceKind::Anchor => self.anchors.len(),
        }
    }
}

/// Toy template engine: arithmetic, object stringification, comments
pub fn evaluate_template(value: &str) -> String {
    if value.contains("12345*54321") {
        "670592745".to_string()
    } else if value.contains("{{.}}") || value.contains("{{this}}") {
        "[object Object]".to_string()
    } else {
        value.replace("{{!comment}}", "")
    }
}

#[derive(Debug, Default)]
struct State {
    current: Option<String>,
    history: Vec<String>,
    overlay: String,
    overlay_classes: Vec<String>,
    values: Vec<String>,
    armed: bool,
    log: Vec<String>,
}

impl State {
    fn enter(&mut self, url: &str, inputs: usize) {
        self.current = Some(url.to_string());
        self.reset(inputs);
    }

    fn reset(&mut self, inputs: usize) {
        self.overlay.clear();
        self.overlay_classes.clear();
        self.values = vec![String::new(); inputs];
        self.armed = false;
    }
}

fn page_key(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

pub struct MockPage {
    pages: Mutex<HashMap<String, SitePage>>,
    state: Mutex<State>,
    hang: HashSet<&'static str>,
    hang_urls: HashSet<String>,
    fail_urls: HashSet<String>,
    navigation_events: bool,
}

impl MockPage {
    pub fn new<'a>(pages: impl IntoIterator<Item = (&'a str, SitePage)>) -> Self {
        Self {
            pages: Mutex::new(
                pages
                    .into_iter()
                    .map(|(url, page)| (url.to_string(), page))
                    .collect(),
            ),
            state: Mutex::new(State::default()),
            hang: HashSet::new(),
            hang_urls: HashSet::new(),
            fail_urls: HashSet::new(),
            navigation_events: true,
        }
    }

    /// Makes an operation never complete. Names: navigate, current_url,
    /// count, type, press, go_back, reload, probe, outer_html,
    /// class_values, fill_inputs, inject_link, submit, click, anchors
    pub fn hanging(mut self, op: &'static str) -> Self {
        self.hang.insert(op);
        self
    }

    pub fn hanging_url(mut self, url: &str) -> Self {
        self.hang_urls.insert(url.to_string());
        self
    }

    pub fn failing_url(mut self, url: &str) -> Self {
        self.fail_urls.insert(url.to_string());
        self
    }

    /// Makes the navigation wait fail outright instead of staying pending
    /// when the document was not replaced
    pub fn without_navigation_events(mut self) -> Self {
        self.navigation_events = false;
        self
    }

    /// Places the page on `url` without going through `navigate`
    pub fn at(self, url: &str) -> Self {
        let inputs = self.page_for(url).inputs;
        self.state.lock().expect("state lock").enter(url, inputs);
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().expect("state lock").log.clone()
    }

    /// Log entries starting with `prefix`
    pub fn logged(&self, prefix: &str) -> usize {
        self.log().iter().filter(|l| l.starts_with(prefix)).count()
    }

    /// Log entries equal to `entry`
    pub fn occurrences(&self, entry: &str) -> usize {
        self.log().iter().filter(|l| l.as_str() == entry).count()
    }

    fn record(&self, entry: String) {
        self.state.lock().expect("state lock").log.push(entry);
    }

    fn page_for(&self, url: &str) -> SitePage {
        self.pages
            .lock()
            .expect("pages lock")
            .get(page_key(url))
            .cloned()
            .unwrap_or_default()
    }

    fn current_page(&self) -> SitePage {
        let current = self.state.lock().expect("state lock").current.clone();
        current.map(|url| self.page_for(&url)).unwrap_or_default()
    }

    async fn gate(&self, op: &'static str) -> BrowserResult<()> {
        if self.hang.contains(op) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn check_bounds(&self, element: ElementRef) -> BrowserResult<()> {
        if element.index < self.current_page().count(element.surface) {
            Ok(())
        } else {
            Err(BrowserError::ElementMissing(element.surface, element.index))
        }
    }

    /// Applies the current page's reaction to `trigger`
    fn fire(&self, trigger: Trigger, values: Option<Vec<String>>) {
        let site = self.current_page();
        let Some(effect) = site.reactions.get(&trigger).cloned() else {
            return;
        };

        if let Some(kind) = effect.remove {
            let current = self.state.lock().expect("state lock").current.clone();
            if let Some(url) = current {
                let mut pages = self.pages.lock().expect("pages lock");
                if let Some(page) = pages.get_mut(page_key(&url)) {
                    match kind {
                        SurfaceKind::Form => page.forms = page.forms.saturating_sub(1),
                        SurfaceKind::Input => page.inputs = page.inputs.saturating_sub(1),
                        SurfaceKind::Button => page.buttons = page.buttons.saturating_sub(1),
                        SurfaceKind::Anchor => {
                            page.anchors.pop();
                        }
                    }
                }
            }
        }

        let target_inputs = effect
            .navigate
            .as_deref()
            .map(|url| self.page_for(url).inputs)
            .unwrap_or(0);

        let mut state = self.state.lock().expect("state lock");
        let submitted: Vec<String> = values
            .unwrap_or_else(|| state.values.clone())
            .into_iter()
            .filter(|v| !v.is_empty())
            .collect();

        let mut text = String::new();
        let mut classes = Vec::new();
        match effect.render {
            Render::Nothing => {}
            Render::Echo => text = submitted.join(" "),
            Render::Evaluate => {
                text = submitted
                    .iter()
                    .map(|v| evaluate_template(v))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            Render::ClassEcho => classes = submitted,
        }

        if let Some(target) = effect.navigate {
            if let Some(previous) = state.current.take() {
                state.history.push(previous);
            }
            state.enter(&target, target_inputs);
            state.log.push(format!("navigated {target}"));
        }
        state.overlay.push_str(&text);
        state.overlay_classes.extend(classes);
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.record(format!("navigate {url}"));
        self.gate("navigate").await?;
        if self.hang_urls.contains(url) {
            std::future::pending::<()>().await;
        }
        let known = self
            .pages
            .lock()
            .expect("pages lock")
            .contains_key(page_key(url));
        if self.fail_urls.contains(url) || !known {
            return Err(BrowserError::Navigation(format!(
                "net::ERR_NAME_NOT_RESOLVED at {url}"
            )));
        }

        let inputs = self.page_for(url).inputs;
        let mut state = self.state.lock().expect("state lock");
        if let Some(previous) = state.current.take() {
            state.history.push(previous);
        }
        state.enter(url, inputs);
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        self.gate("current_url").await?;
        Ok(self
            .state
            .lock()
            .expect("state lock")
            .current
            .clone()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn evaluate(&self, script: &Script) -> BrowserResult<Value> {
        let site = self.current_page();
        match script {
            Script::ProbeGlobal(expression) => {
                self.gate("probe").await?;
                if site.globals.iter().any(|g| g == expression) {
                    Ok(json!(true))
                } else {
                    Err(BrowserError::Reference(format!(
                        "{expression} is not defined"
                    )))
                }
            }
            Script::OuterHtml => {
                self.gate("outer_html").await?;
                let overlay = self.state.lock().expect("state lock").overlay.clone();
                Ok(json!(format!(
                    "<html><head></head><body>{}{}</body></html>",
                    site.body, overlay
                )))
            }
            Script::ClassValues => {
                self.gate("class_values").await?;
                let classes = self.state.lock().expect("state lock").overlay_classes.clone();
                Ok(json!(classes))
            }
            Script::FillInputs { value } => {
                self.gate("fill_inputs").await?;
                let mut state = self.state.lock().expect("state lock");
                state.values = vec![value.clone(); site.inputs];
                state.log.push(format!("fill {value}"));
                Ok(json!(site.inputs))
            }
            Script::InjectLinkQuery { index, payload } => {
                self.gate("inject_link").await?;
                let Some(href) = site.anchors.get(*index) else {
                    return Ok(json!(false));
                };
                self.record(format!("follow {index}"));
                let values = if href.contains('?') {
                    vec![payload.clone()]
                } else {
                    Vec::new()
                };
                self.fire(Trigger::Follow(*index), Some(values));
                Ok(json!(true))
            }
            Script::SubmitForm(index) => {
                self.gate("submit").await?;
                if *index >= site.forms {
                    return Err(BrowserError::Script(format!(
                        "RangeError: form {index} is gone"
                    )));
                }
                self.record(format!("submit {index}"));
                self.fire(Trigger::Submit(*index), None);
                Ok(json!(true))
            }
            Script::Click(element) => {
                self.gate("click").await?;
                self.check_bounds(*element)?;
                self.record(format!("click {} {}", element.surface, element.index));
                match element.surface {
                    SurfaceKind::Anchor => self.fire(Trigger::Follow(element.index), None),
                    _ => self.fire(Trigger::Click(element.index), None),
                }
                Ok(json!(true))
            }
            Script::Focus(element) => {
                self.check_bounds(*element)?;
                self.record(format!("focus {} {}", element.surface, element.index));
                Ok(json!(true))
            }
            Script::AnchorHrefs => {
                self.gate("anchors").await?;
                Ok(json!(site.anchors))
            }
            Script::Count(selector) => {
                let n = match selector.as_str() {
                    "form" => site.forms,
                    "input" => site.inputs,
                    "button" => site.buttons,
                    "a" => site.anchors.len(),
                    _ => 0,
                };
                Ok(json!(n))
            }
            Script::ArmNavigation => {
                self.state.lock().expect("state lock").armed = true;
                Ok(json!(true))
            }
            Script::NavigationArmed => Ok(json!(self.state.lock().expect("state lock").armed)),
        }
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        self.gate("count").await?;
        let value = self
            .evaluate(&Script::Count(selector.to_string()))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn type_text(&self, element: ElementRef, text: &str) -> BrowserResult<()> {
        self.gate("type").await?;
        self.evaluate(&Script::Focus(element)).await?;
        let mut state = self.state.lock().expect("state lock");
        if state.values.len() <= element.index {
            state.values.resize(element.index + 1, String::new());
        }
        state.values[element.index].push_str(text);
        state.log.push(format!("type {} {text}", element.index));
        Ok(())
    }

    async fn press_key(&self, element: ElementRef, key: &str) -> BrowserResult<()> {
        self.gate("press").await?;
        self.check_bounds(element)?;
        self.record(format!("press {} {key}", element.index));
        if key == "Enter" {
            self.fire(Trigger::Enter(element.index), None);
        }
        Ok(())
    }

    async fn arm_navigation(&self) -> BrowserResult<()> {
        self.evaluate(&Script::ArmNavigation).await.map(|_| ())
    }

    async fn wait_for_navigation(&self) -> BrowserResult<()> {
        let armed = self.state.lock().expect("state lock").armed;
        if armed && !self.navigation_events {
            return Err(BrowserError::Navigation(
                "no navigation is pending".to_string(),
            ));
        }
        if armed {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn go_back(&self) -> BrowserResult<()> {
        self.record("go_back".to_string());
        self.gate("go_back").await?;
        let previous = self.state.lock().expect("state lock").history.pop();
        let Some(previous) = previous else {
            return Err(BrowserError::Navigation("no history entry".to_string()));
        };
        let inputs = self.page_for(&previous).inputs;
        self.state.lock().expect("state lock").enter(&previous, inputs);
        Ok(())
    }

    async fn reload(&self) -> BrowserResult<()> {
        self.record("reload".to_string());
        self.gate("reload").await?;
        let inputs = self.current_page().inputs;
        self.state.lock().expect("state lock").reset(inputs);
        Ok(())
    }
}
