//! Core data models for the CSTI scanner

use crate::engines::Engine;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Kind of interactive element a payload can be injected through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Form,
    Input,
    Button,
    Anchor,
}

impl SurfaceKind {
    /// CSS selector used to enumerate this surface on a live page
    pub fn selector(&self) -> &'static str {
        match self {
            SurfaceKind::Form => "form",
            SurfaceKind::Input => "input",
            SurfaceKind::Button => "button",
            SurfaceKind::Anchor => "a",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

/// One of the per-page checks run by the orchestrator, in execution order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    Forms,
    Inputs,
    Buttons,
    Links,
    ClassReflection,
}

impl ProbeKind {
    /// Surface enumerated by this probe
    pub fn surface(&self) -> SurfaceKind {
        match self {
            ProbeKind::Forms | ProbeKind::ClassReflection => SurfaceKind::Form,
            ProbeKind::Inputs => SurfaceKind::Input,
            ProbeKind::Buttons => SurfaceKind::Button,
            ProbeKind::Links => SurfaceKind::Anchor,
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Forms => write!(f, "forms"),
            ProbeKind::Inputs => write!(f, "inputs"),
            ProbeKind::Buttons => write!(f, "buttons"),
            ProbeKind::Links => write!(f, "links"),
            ProbeKind::ClassReflection => write!(f, "class"),
        }
    }
}

/// What happened after a triggering action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// The document was replaced
    Navigated,
    /// The driver reported that no navigation can follow
    NoNavigation,
    /// Nothing happened inside the post-trigger window
    TimedOut,
}

impl NavigationOutcome {
    pub fn navigated(&self) -> bool {
        matches!(self, NavigationOutcome::Navigated)
    }
}

/// A confirmed reflection of an evaluated payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    /// Page the probe started from (its baseline URL)
    pub page_url: String,
    /// Check that produced the reflection
    pub probe: ProbeKind,
    /// Index of the surface instance that was perturbed
    pub index: usize,
    /// Engine whose payload was injected, `None` for class reflection
    pub engine: Option<Engine>,
    /// Injected string
    pub payload: String,
    /// URL the browser was on when the reflection was observed
    pub observed_url: Option<String>,
}

/// Why a page produced the verdict it did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageStatus {
    Scanned,
    Skipped { reason: String },
    Unreachable { reason: String },
}

/// Per-page scan verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVerdict {
    pub url: String,
    /// Resolved engine, `None` when the page could not be fingerprinted
    pub engine: Option<Engine>,
    pub status: PageStatus,
    pub vulnerable: bool,
    /// Result of every probe that actually ran on this page
    pub surfaces: BTreeMap<ProbeKind, bool>,
    pub findings: Vec<Finding>,
}

impl PageVerdict {
    pub fn scanned(url: impl Into<String>, engine: Engine) -> Self {
        Self {
            url: url.into(),
            engine: Some(engine),
            status: PageStatus::Scanned,
            vulnerable: false,
            surfaces: BTreeMap::new(),
            findings: Vec::new(),
        }
    }

    pub fn skipped(url: impl Into<String>, engine: Option<Engine>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            engine,
            status: PageStatus::Skipped {
                reason: reason.into(),
            },
            vulnerable: false,
            surfaces: BTreeMap::new(),
            findings: Vec::new(),
        }
    }

    pub fn unreachable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            engine: None,
            status: PageStatus::Unreachable {
                reason: reason.into(),
            },
            vulnerable: false,
            surfaces: BTreeMap::new(),
            findings: Vec::new(),
        }
    }

    /// Engine id for display, `"unknown"` when unresolved
    pub fn engine_label(&self) -> &str {
        self.engine.map(|e| e.id()).unwrap_or("unknown")
    }

    /// Records the outcome of one probe
    pub fn record(&mut self, probe: ProbeKind, vulnerable: bool, findings: Vec<Finding>) {
        self.surfaces.insert(probe, vulnerable);
        self.vulnerable |= vulnerable;
        self.findings.extend(findings);
    }
}

/// Result of a complete scan run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Target URL as finally reached (may carry the toggled `www.` host)
    pub target: String,
    /// Unique scan identifier
    pub scan_id: String,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub pages: Vec<PageVerdict>,
    pub vulnerable: bool,
}

impl ScanReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            scan_id: uuid::Uuid::new_v4().to_string(),
            started_at: Local::now(),
            finished_at: None,
            pages: Vec::new(),
            vulnerable: false,
        }
    }

    pub fn push(&mut self, verdict: PageVerdict) {
        self.vulnerable |= verdict.vulnerable;
        self.pages.push(verdict);
    }

    /// All findings across every scanned page
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.pages.iter().flat_map(|p| p.findings.iter())
    }

    /// Marks the scan as finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }
}

/// Per-operation deadlines, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    /// Engine detection probe evaluation
    pub probe_ms: u64,
    /// Reflection oracle evaluation
    pub reflection_ms: u64,
    /// Surface enumeration
    pub enumeration_ms: u64,
    /// Payload injection scripts and keystrokes
    pub injection_ms: u64,
    /// Submit / press / click
    pub trigger_ms: u64,
    /// Window in which a trigger may start a navigation
    pub post_trigger_navigation_ms: u64,
    /// Explicit navigations (target entry, crawl, baseline restore)
    pub navigation_ms: u64,
    /// History back and reload
    pub history_ms: u64,
}

impl Timeouts {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn reflection(&self) -> Duration {
        Duration::from_millis(self.reflection_ms)
    }

    pub fn enumeration(&self) -> Duration {
        Duration::from_millis(self.enumeration_ms)
    }

    pub fn injection(&self) -> Duration {
        Duration::from_millis(self.injection_ms)
    }

    pub fn trigger(&self) -> Duration {
        Duration::from_millis(self.trigger_ms)
    }

    pub fn post_trigger_navigation(&self) -> Duration {
        Duration::from_millis(self.post_trigger_navigation_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn history(&self) -> Duration {
        Duration::from_millis(self.history_ms)
    }

    /// Same deadline for every operation
    pub fn uniform(ms: u64) -> Self {
        Self {
            probe_ms: ms,
            reflection_ms: ms,
            enumeration_ms: ms,
            injection_ms: ms,
            trigger_ms: ms,
            post_trigger_navigation_ms: ms,
            navigation_ms: ms,
            history_ms: ms,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe_ms: 10_000,
            reflection_ms: 10_000,
            enumeration_ms: 10_000,
            injection_ms: 10_000,
            trigger_ms: 10_000,
            post_trigger_navigation_ms: 5_000,
            navigation_ms: 10_000,
            history_ms: 10_000,
        }
    }
}

/// Launch settings for the headless browser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chrome/Chromium binary, autodetected when unset
    pub executable: Option<PathBuf>,
    /// Extra command line flags appended to the hardening defaults
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            extra_args: Vec::new(),
        }
    }
}

/// Configuration for a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Target URL to scan
    pub target: String,
    /// Engine the caller believes the target uses
    #[serde(default)]
    pub engine_hint: Option<Engine>,
    /// Extend the scan to same-site pages found by the crawler
    #[serde(default)]
    pub crawl: bool,
    /// Maximum crawl depth
    #[serde(default = "default_crawl_depth")]
    pub crawl_depth: u32,
    /// Accept subdomains of the target host while crawling
    #[serde(default)]
    pub crawl_subdomains: bool,
    #[serde(default)]
    pub skip_forms: bool,
    #[serde(default)]
    pub skip_inputs: bool,
    #[serde(default)]
    pub skip_buttons: bool,
    #[serde(default)]
    pub skip_links: bool,
    /// Run the class-attribute reflection probe
    #[serde(default)]
    pub check_class: bool,
    /// Keep scanning after the first positive
    #[serde(default)]
    pub continue_when_positive: bool,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub browser: BrowserSettings,
}

fn default_crawl_depth() -> u32 {
    1
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            engine_hint: None,
            crawl: false,
            crawl_depth: default_crawl_depth(),
            crawl_subdomains: false,
            skip_forms: false,
            skip_inputs: false,
            skip_buttons: false,
            skip_links: false,
            check_class: false,
            continue_when_positive: false,
            timeouts: Timeouts::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl ScanConfig {
    /// Whether the given probe is switched on for this scan
    pub fn probe_enabled(&self, probe: ProbeKind) -> bool {
        match probe {
            ProbeKind::Forms => !self.skip_forms,
            ProbeKind::Inputs => !self.skip_inputs,
            ProbeKind::Buttons => !self.skip_buttons,
            ProbeKind::Links => !self.skip_links,
            ProbeKind::ClassReflection => self.check_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_enabled_defaults() {
        let config = ScanConfig::default();
        assert!(config.probe_enabled(ProbeKind::Forms));
        assert!(config.probe_enabled(ProbeKind::Links));
        assert!(!config.probe_enabled(ProbeKind::ClassReflection));
    }

    #[test]
    fn test_verdict_record_accumulates() {
        let mut verdict = PageVerdict::scanned("https://example.com/", Engine::Vue);
        verdict.record(ProbeKind::Forms, false, Vec::new());
        verdict.record(ProbeKind::Inputs, true, Vec::new());
        assert!(verdict.vulnerable);
        assert_eq!(verdict.surfaces.get(&ProbeKind::Forms), Some(&false));
        assert_eq!(verdict.surfaces.get(&ProbeKind::Inputs), Some(&true));
    }

    #[test]
    fn test_default_timeouts() {
        let t = Timeouts::default();
        assert_eq!(t.post_trigger_navigation(), Duration::from_secs(5));
        assert_eq!(t.navigation(), Duration::from_secs(10));
    }
}
