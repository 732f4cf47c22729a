//! Client-side template engine catalog
//!
//! Every engine carries a detection probe (a global the engine exposes), an
//! injection payload, and the reflection mode that tells the oracle what an
//! evaluated payload looks like in rendered markup. [`Engine::ALL`] is the
//! fingerprinting order and must stay stable.

pub mod fingerprint;
pub mod reflection;

use crate::error::{CstiError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Evaluated form of `12345*54321`
pub const COMPUTED_RESULT: &str = "670592745";

/// What engines that stringify their context object render
pub const OBJECT_MARKER_PATTERN: &str = r"\[object Object\]";

static COMPUTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COMPUTED_RESULT).expect("literal digits are a valid regex"));

static OBJECT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(OBJECT_MARKER_PATTERN).expect("object marker pattern is a valid regex")
});

/// Supported template engines, in fingerprinting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Angular,
    Vue,
    Mavo,
    Handlebars,
    Regular,
    Template7,
    Ejs,
    Marko,
    Tmpl,
    Ember,
    JsRender,
    Dot,
    #[serde(rename = "art-template")]
    ArtTemplate,
    Tempo,
    Transparency,
    Svelte,
    Underscore,
    Lit,
    Mustache,
    Hogan,
    Twig,
    Markup,
    Dust,
    Nunjucks,
    Pug,
    #[serde(rename = "loadTemplate")]
    LoadTemplate,
    Pure,
    Squirrelly,
    Swig,
    Icanhaz,
    Juicer,
    Alpine,
}

/// How an evaluated payload shows up in rendered markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionMode {
    /// Arithmetic payload rendered as its result
    ComputedValue,
    /// Engine stringified an object
    GenericMarker,
}

impl ReflectionMode {
    /// Pattern searched for in the page's full markup
    pub fn pattern(&self) -> &'static str {
        match self {
            ReflectionMode::ComputedValue => COMPUTED_RESULT,
            ReflectionMode::GenericMarker => OBJECT_MARKER_PATTERN,
        }
    }

    pub fn regex(&self) -> &'static Regex {
        match self {
            ReflectionMode::ComputedValue => &COMPUTED_RE,
            ReflectionMode::GenericMarker => &OBJECT_MARKER_RE,
        }
    }
}

impl fmt::Display for ReflectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflectionMode::ComputedValue => write!(f, "computed"),
            ReflectionMode::GenericMarker => write!(f, "marker"),
        }
    }
}

/// Catalog row for one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineSignature {
    pub id: &'static str,
    /// Expression evaluated in page context; defined when the engine is loaded
    pub detection_probe: &'static str,
    pub payload: &'static str,
    pub reflection: ReflectionMode,
    /// Payload is a literal marker rather than an evaluable expression, so
    /// a positive needs manual confirmation
    pub inert_payload: bool,
}

const fn sig(
    id: &'static str,
    detection_probe: &'static str,
    payload: &'static str,
    reflection: ReflectionMode,
) -> EngineSignature {
    EngineSignature {
        id,
        detection_probe,
        payload,
        reflection,
        inert_payload: false,
    }
}

const fn inert(
    id: &'static str,
    detection_probe: &'static str,
    payload: &'static str,
    reflection: ReflectionMode,
) -> EngineSignature {
    EngineSignature {
        id,
        detection_probe,
        payload,
        reflection,
        inert_payload: true,
    }
}

use ReflectionMode::{ComputedValue as Computed, GenericMarker as Marker};

impl Engine {
    pub const ALL: [Engine; 32] = [
        Engine::Angular,
        Engine::Vue,
        Engine::Mavo,
        Engine::Handlebars,
        Engine::Regular,
        Engine::Template7,
        Engine::Ejs,
        Engine::Marko,
        Engine::Tmpl,
        Engine::Ember,
        Engine::JsRender,
        Engine::Dot,
        Engine::ArtTemplate,
        Engine::Tempo,
        Engine::Transparency,
        Engine::Svelte,
        Engine::Underscore,
        Engine::Lit,
        Engine::Mustache,
        Engine::Hogan,
        Engine::Twig,
        Engine::Markup,
        Engine::Dust,
        Engine::Nunjucks,
        Engine::Pug,
        Engine::LoadTemplate,
        Engine::Pure,
        Engine::Squirrelly,
        Engine::Swig,
        Engine::Icanhaz,
        Engine::Juicer,
        Engine::Alpine,
    ];

    pub fn signature(&self) -> EngineSignature {
        match self {
            Engine::Angular => sig("angular", "angular.version", "{{12345*54321}}", Computed),
            Engine::Vue => sig("vue", "Vue", "{{12345*54321}}", Computed),
            Engine::Mavo => sig("mavo", "Mavo", "[12345*54321]", Computed),
            Engine::Handlebars => sig("handlebars", "Handlebars", "{{this}}", Marker),
            Engine::Regular => sig("regular", "Regular", "{12345*54321}", Computed),
            Engine::Template7 => sig(
                "template7",
                "Template7",
                "{{js \"12345*54321\"}}",
                Computed,
            ),
            Engine::Ejs => sig("ejs", "ejs", "<%=12345*54321%>", Computed),
            Engine::Marko => sig("marko", "Marko", "${12345*54321}", Computed),
            Engine::Tmpl => sig("tmpl", "$.tmpl", "${12345*54321}", Computed),
            Engine::Ember => sig("ember", "Ember", "{{12345*54321}}", Computed),
            Engine::JsRender => sig("jsrender", "jsrender", "{{:12345*54321}}", Computed),
            Engine::Dot => sig("dot", "doT", "{{=12345*54321}}", Computed),
            Engine::ArtTemplate => sig("art-template", "template", "{{12345*54321}}", Computed),
            Engine::Tempo => sig("tempo", "Tempo", "{{this}}", Marker),
            Engine::Transparency => inert("transparency", "Transparency", "Transparency", Computed),
            Engine::Svelte => sig("svelte", "__svelte", "{12345*54321}", Computed),
            Engine::Underscore => sig("underscore", "_.template", "<%=12345*54321%>", Computed),
            Engine::Lit => sig("lit", "litHtmlVersions", "${12345*54321}", Computed),
            Engine::Mustache => sig("mustache", "Mustache", "{{.}}", Marker),
            Engine::Hogan => sig("hogan", "Hogan", "6705{{!comment}}92745", Computed),
            Engine::Twig => sig("twig", "Twig", "{{12345*54321}}", Computed),
            Engine::Markup => sig("markup", "Markup", "{{.}}", Marker),
            Engine::Dust => sig("dust", "dust", "{{.}}", Marker),
            Engine::Nunjucks => sig("nunjucks", "nunjucks", "{{12345*54321}}", Computed),
            Engine::Pug => sig("pug", "pug", "#{12345*54321}", Computed),
            Engine::LoadTemplate => inert(
                "loadTemplate",
                "loadTemplate",
                "$('test').loadTemplate",
                Marker,
            ),
            Engine::Pure => sig("pure", "$p", "#{12345*54321}", Computed),
            // Probe and payload are both the bare global name; kept as-is and
            // flagged inert rather than guessing an evaluable payload.
            Engine::Squirrelly => inert("squirrelly", "Sqrl", "Sqrl", Computed),
            Engine::Swig => sig("swig", "swig", "{{12345*54321}}", Computed),
            Engine::Icanhaz => sig("icanhaz", "ich", "6705{{!comment}}92745", Computed),
            Engine::Juicer => sig("juicer", "Juicer", "${12345*54321}}", Computed),
            Engine::Alpine => sig("alpine", "Alpine", "12345*54321", Computed),
        }
    }

    pub fn id(&self) -> &'static str {
        self.signature().id
    }

    pub fn payload(&self) -> &'static str {
        self.signature().payload
    }

    /// Engines in fingerprinting order. Restartable: each call starts over.
    pub fn all() -> impl Iterator<Item = Engine> {
        Self::ALL.into_iter()
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Engine {
    type Err = CstiError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Engine::all()
            .find(|e| e.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CstiError::UnknownEngine(wanted.to_string()))
    }
}

/// Catalog lookup by engine id
pub fn lookup(id: &str) -> Option<EngineSignature> {
    id.parse::<Engine>().ok().map(|e| e.signature())
}

/// Checks the catalog invariants. Run once before a scan starts.
pub fn validate() -> Result<()> {
    let mut ids = HashSet::new();
    for engine in Engine::all() {
        let sig = engine.signature();
        if !ids.insert(sig.id) {
            return Err(CstiError::CatalogError(format!("duplicate id '{}'", sig.id)));
        }
        if sig.detection_probe.is_empty() || sig.payload.is_empty() {
            return Err(CstiError::CatalogError(format!(
                "engine '{}' lacks a probe or payload",
                sig.id
            )));
        }
        match sig.id.parse::<Engine>() {
            Ok(parsed) if parsed == engine => {}
            _ => {
                return Err(CstiError::CatalogError(format!(
                    "id '{}' does not resolve to its own engine",
                    sig.id
                )))
            }
        }
        Regex::new(sig.reflection.pattern()).map_err(|e| {
            CstiError::CatalogError(format!("bad reflection pattern for '{}': {e}", sig.id))
        })?;
    }
    Ok(())
}
