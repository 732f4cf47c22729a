//! Browser automation surface
//!
//! The scanner core talks to the browser only through [`PageDriver`]. Every
//! call is wrapped in [`bounded`] by the caller so that a hung script or a
//! stalled network can only fail one step, never the whole scan.

#[cfg(feature = "browser")]
pub mod chromium;
pub mod script;

/// Stub driver when the browser feature is not enabled
#[cfg(not(feature = "browser"))]
pub mod chromium {
    use super::{BrowserError, BrowserResult, ElementRef, PageDriver, Script};
    use crate::models::BrowserSettings;
    use async_trait::async_trait;

    fn unavailable() -> BrowserError {
        BrowserError::Protocol(
            "Browser driving requires the 'browser' feature flag. \
             Compile with: cargo build --features browser"
                .to_string(),
        )
    }

    pub struct ChromiumSession {
        _private: (),
    }

    impl ChromiumSession {
        pub async fn launch(_settings: &BrowserSettings) -> BrowserResult<Self> {
            Err(unavailable())
        }

        pub async fn close(self) {}
    }

    #[async_trait]
    impl PageDriver for ChromiumSession {
        async fn navigate(&self, _url: &str) -> BrowserResult<()> {
            Err(unavailable())
        }

        async fn current_url(&self) -> BrowserResult<String> {
            Err(unavailable())
        }

        async fn evaluate(&self, _script: &Script) -> BrowserResult<serde_json::Value> {
            Err(unavailable())
        }

        async fn count(&self, _selector: &str) -> BrowserResult<usize> {
            Err(unavailable())
        }

        async fn type_text(&self, _element: ElementRef, _text: &str) -> BrowserResult<()> {
            Err(unavailable())
        }

        async fn press_key(&self, _element: ElementRef, _key: &str) -> BrowserResult<()> {
            Err(unavailable())
        }

        async fn arm_navigation(&self) -> BrowserResult<()> {
            Err(unavailable())
        }

        async fn wait_for_navigation(&self) -> BrowserResult<()> {
            Err(unavailable())
        }

        async fn go_back(&self) -> BrowserResult<()> {
            Err(unavailable())
        }

        async fn reload(&self) -> BrowserResult<()> {
            Err(unavailable())
        }
    }
}

pub use script::Script;

use crate::models::SurfaceKind;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a page driver
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserError {
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The script referenced a global that does not exist
    #[error("reference error: {0}")]
    Reference(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("no {0} element at index {1}")]
    ElementMissing(SurfaceKind, usize),

    #[error("browser protocol error: {0}")]
    Protocol(String),
}


pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Deadline elapsed before the wrapped operation completed
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("timed out after {0:?}")]
pub struct TimedOut(pub Duration);

impl From<TimedOut> for BrowserError {
    fn from(t: TimedOut) -> Self {
        BrowserError::Timeout(t.0)
    }
}

/// Races `operation` against a timer. On expiry the operation is dropped and
/// its eventual completion is ignored.
pub async fn with_timeout<F>(duration: Duration, operation: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(duration, operation)
        .await
        .map_err(|_| TimedOut(duration))
}

/// [`with_timeout`] for fallible browser calls, folding the deadline into
/// [`BrowserError::Timeout`]
pub async fn bounded<T, F>(duration: Duration, operation: F) -> BrowserResult<T>
where
    F: Future<Output = BrowserResult<T>>,
{
    with_timeout(duration, operation).await?
}

/// Address of one element on the live page. Resolved again on every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub surface: SurfaceKind,
    pub index: usize,
}

impl ElementRef {
    pub fn new(surface: SurfaceKind, index: usize) -> Self {
        Self { surface, index }
    }
}

/// Capabilities the scanner needs from a browser page
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url` and waits for the page to settle
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// URL of the current document
    async fn current_url(&self) -> BrowserResult<String>;

    /// Runs a script in the page context and returns its JSON value
    async fn evaluate(&self, script: &Script) -> BrowserResult<serde_json::Value>;

    /// Number of elements matching `selector`
    async fn count(&self, selector: &str) -> BrowserResult<usize>;

    /// Clicks an element through the DOM
    async fn click(&self, element: ElementRef) -> BrowserResult<()> {
        self.evaluate(&Script::Click(element)).await.map(|_| ())
    }

    /// Keystroke-level typing into an element. The element is focused
    /// first, never clicked.
    async fn type_text(&self, element: ElementRef, text: &str) -> BrowserResult<()>;

    /// Presses a single key (e.g. `Enter`) on an element
    async fn press_key(&self, element: ElementRef, key: &str) -> BrowserResult<()>;

    /// Marks the current document so a later navigation can be observed
    async fn arm_navigation(&self) -> BrowserResult<()>;

    /// Resolves once the armed document has been replaced. Never resolves
    /// while the page stays put; callers bound it.
    async fn wait_for_navigation(&self) -> BrowserResult<()>;

    /// History back
    async fn go_back(&self) -> BrowserResult<()>;

    /// Reloads the current document
    async fn reload(&self) -> BrowserResult<()>;
}
