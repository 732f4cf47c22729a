//! Headless Chromium page driver
//!
//! Uses `chromiumoxide` to launch one browser with one page, shared
//! sequentially by the whole scan. Only available with the `browser` feature.

use super::script::{unwrap_envelope, Script};
use super::{BrowserError, BrowserResult, ElementRef, PageDriver};
use crate::models::BrowserSettings;
use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Flags passed to every launched browser
const HARDENING_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-default-apps",
    "--disable-gpu",
    "--disable-sync",
    "--disable-translate",
    "--hide-scrollbars",
    "--metrics-recording-only",
    "--mute-audio",
    "--no-first-run",
    "--safebrowsing-disable-auto-update",
    "--js-flags=--noexpose_wasm,--jitless",
];

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn protocol(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Protocol(e.to_string())
}

/// One browser process driving a single page
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launches Chromium and opens a blank page
    pub async fn launch(settings: &BrowserSettings) -> BrowserResult<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = settings.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in HARDENING_ARGS {
            builder = builder.arg(*arg);
        }
        for arg in &settings.extra_args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::Protocol(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(protocol)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(protocol)?;
        info!("Browser session initialized");

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Closes the browser and stops its event handler
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Error closing browser: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }

    async fn element(&self, element: ElementRef) -> BrowserResult<Element> {
        let mut elements = self
            .page
            .find_elements(element.surface.selector())
            .await
            .map_err(protocol)?;
        if element.index >= elements.len() {
            return Err(BrowserError::ElementMissing(element.surface, element.index));
        }
        Ok(elements.swap_remove(element.index))
    }
}

#[async_trait]
impl PageDriver for ChromiumSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        self.page
            .url()
            .await
            .map_err(protocol)?
            .ok_or_else(|| BrowserError::Protocol("page has no URL".to_string()))
    }

    async fn evaluate(&self, script: &Script) -> BrowserResult<serde_json::Value> {
        let envelope = self
            .page
            .evaluate(script.source())
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value::<serde_json::Value>()
            .map_err(protocol)?;
        unwrap_envelope(envelope)
    }

    async fn count(&self, selector: &str) -> BrowserResult<usize> {
        let value = self.evaluate(&Script::Count(selector.to_string())).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| BrowserError::Protocol(format!("non-numeric count: {value}")))
    }

    async fn type_text(&self, element: ElementRef, text: &str) -> BrowserResult<()> {
        self.evaluate(&Script::Focus(element)).await?;
        let el = self.element(element).await?;
        el.type_str(text).await.map_err(protocol)?;
        Ok(())
    }

    async fn press_key(&self, element: ElementRef, key: &str) -> BrowserResult<()> {
        let el = self.element(element).await?;
        el.press_key(key).await.map_err(protocol)?;
        Ok(())
    }

    async fn arm_navigation(&self) -> BrowserResult<()> {
        self.evaluate(&Script::ArmNavigation).await.map(|_| ())
    }

    async fn wait_for_navigation(&self) -> BrowserResult<()> {
        loop {
            // Evaluation fails while the old context is being torn down
            match self.evaluate(&Script::NavigationArmed).await {
                Ok(serde_json::Value::Bool(true)) => {}
                Ok(_) => break,
                Err(e) => debug!("Navigation poll: {}", e),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        self.page.wait_for_navigation().await.map_err(protocol)?;
        Ok(())
    }

    async fn go_back(&self) -> BrowserResult<()> {
        self.page
            .evaluate("history.back()")
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn reload(&self) -> BrowserResult<()> {
        self.page
            .reload()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(())
    }
}
