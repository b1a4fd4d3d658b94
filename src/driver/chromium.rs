//! chromiumoxide-backed [`PageDriver`] implementation.
//!
//! Owns the headless Chrome process, the CDP handler loop, and a single
//! page. Downloads are routed into the artifact directory through the CDP
//! `Browser.setDownloadBehavior` command, which is what makes the
//! filesystem the only observable completion signal for the crawl core.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{DriverError, PageDriver};

/// How often `wait_for_marker` probes for the element.
const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on how long `navigate` waits for a page load to settle.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// A single headless Chrome page driven over CDP.
///
/// The handler loop runs on its own tokio task for the lifetime of the
/// driver; all page operations stay on the caller's task, so they are
/// sequenced exactly as the caller awaits them.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launches headless Chrome and prepares a page whose downloads land in
    /// `download_dir` (created if absent).
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Session`] if the directory cannot be created,
    /// the browser fails to launch, or download routing cannot be
    /// configured.
    pub async fn launch(download_dir: &Path) -> Result<Self, DriverError> {
        tokio::fs::create_dir_all(download_dir).await.map_err(|e| {
            DriverError::session(format!(
                "cannot create download directory {}: {e}",
                download_dir.display()
            ))
        })?;

        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .build()
            .map_err(DriverError::session)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::session(format!("browser launch failed: {e}")))?;

        // Drive CDP messages until the browser connection goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            trace!("CDP handler loop ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::session(format!("cannot open page: {e}")))?;

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_dir.display().to_string())
            .build()
            .map_err(DriverError::session)?;
        browser
            .execute(behavior)
            .await
            .map_err(|e| DriverError::session(format!("cannot configure downloads: {e}")))?;

        debug!(download_dir = %download_dir.display(), "browser launched");
        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    /// Shuts the browser down and stops the handler loop.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "browser did not exit cleanly");
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        trace!(url, "navigate");
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::navigation(url, e.to_string()))?;

        // goto resolves when the navigation commits; wait for the load to
        // settle so marker waits start from a rendered document.
        tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.wait_for_navigation())
            .await
            .map_err(|_| {
                DriverError::navigation(url, format!("load did not settle in {NAVIGATION_TIMEOUT:?}"))
            })?
            .map_err(|e| DriverError::navigation(url, e.to_string()))?;
        Ok(())
    }

    async fn wait_for_marker(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // find_element fails while the element is absent; keep probing
            // until the deadline.
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::marker_timeout(selector, timeout));
            }
            tokio::time::sleep(MARKER_POLL_INTERVAL).await;
        }
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), DriverError> {
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| {
                DriverError::navigation("(pending)", format!("navigation did not settle in {timeout:?}"))
            })?
            .map_err(|e| DriverError::navigation("(pending)", e.to_string()))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::evaluation(e.to_string()))?;
        // An undefined result carries no value; treat it as null.
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn click(&self, x: f64, y: f64) -> Result<(), DriverError> {
        trace!(x, y, "click");
        let press = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MousePressed)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|detail| DriverError::input("(coordinate click)", detail))?;
        let release = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseReleased)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|detail| DriverError::input("(coordinate click)", detail))?;

        self.page
            .execute(press)
            .await
            .map_err(|e| DriverError::input("(coordinate click)", e.to_string()))?;
        self.page
            .execute(release)
            .await
            .map_err(|e| DriverError::input("(coordinate click)", e.to_string()))?;
        Ok(())
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::input(selector, e.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| DriverError::input(selector, e.to_string()))?;
        element
            .type_str(text)
            .await
            .map_err(|e| DriverError::input(selector, e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map_err(|e| DriverError::session(e.to_string()))?
            .ok_or_else(|| DriverError::session("page has no URL"))
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.page
            .content()
            .await
            .map_err(|e| DriverError::session(e.to_string()))
    }
}
