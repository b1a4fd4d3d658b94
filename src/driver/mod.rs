//! Capability surface over the remote browser page.
//!
//! The crawl core never talks CDP directly. It consumes a small set of
//! black-box operations - navigate, wait for a marker element, evaluate a
//! script, click at a position, type into a field - behind the
//! [`PageDriver`] trait, so the core stays testable against a scripted
//! double and swappable across driver backends.
//!
//! The production implementation lives in [`chromium`].

pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::ChromiumDriver;

/// Errors surfaced by a [`PageDriver`] implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Navigation to a URL failed (network, protocol, or browser error).
    #[error("navigation to {url} failed: {detail}")]
    Navigation {
        /// The URL that failed to load.
        url: String,
        /// Backend-specific failure detail.
        detail: String,
    },

    /// A marker element did not appear within the allotted time.
    #[error("timed out after {timeout:?} waiting for {selector}")]
    MarkerTimeout {
        /// The selector that never matched.
        selector: String,
        /// How long the driver waited.
        timeout: Duration,
    },

    /// In-page script evaluation failed or returned an unusable value.
    #[error("script evaluation failed: {detail}")]
    Evaluation {
        /// Backend-specific failure detail.
        detail: String,
    },

    /// Keyboard/mouse input could not be delivered.
    #[error("input to {selector} failed: {detail}")]
    Input {
        /// The selector the input targeted.
        selector: String,
        /// Backend-specific failure detail.
        detail: String,
    },

    /// The browser session itself is broken (launch failure, lost
    /// connection, closed page).
    #[error("browser session error: {detail}")]
    Session {
        /// Backend-specific failure detail.
        detail: String,
    },
}

impl DriverError {
    /// Creates a navigation error.
    pub fn navigation(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates a marker-timeout error.
    pub fn marker_timeout(selector: impl Into<String>, timeout: Duration) -> Self {
        Self::MarkerTimeout {
            selector: selector.into(),
            timeout,
        }
    }

    /// Creates an evaluation error.
    pub fn evaluation(detail: impl Into<String>) -> Self {
        Self::Evaluation {
            detail: detail.into(),
        }
    }

    /// Creates an input error.
    pub fn input(selector: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Input {
            selector: selector.into(),
            detail: detail.into(),
        }
    }

    /// Creates a session error.
    pub fn session(detail: impl Into<String>) -> Self {
        Self::Session {
            detail: detail.into(),
        }
    }

    /// Whether this error is a marker-wait timeout.
    #[must_use]
    pub fn is_marker_timeout(&self) -> bool {
        matches!(self, Self::MarkerTimeout { .. })
    }
}

/// Black-box operations against a single browsing context.
///
/// A driver has exactly one current page/URL, so callers must sequence
/// operations strictly: one in flight at a time, never two concurrent
/// navigations. The crate enforces this structurally by routing all access
/// through a borrowed [`crate::session::Session`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates the page to `url` and waits for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Waits until an element matching `selector` exists.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MarkerTimeout`] if the element does not appear
    /// within `timeout`.
    async fn wait_for_marker(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Waits for an in-flight navigation (for example one triggered by a
    /// click) to complete.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), DriverError>;

    /// Evaluates `script` in the page and returns its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError>;

    /// Clicks at viewport coordinates (`x`, `y`).
    async fn click(&self, x: f64, y: f64) -> Result<(), DriverError>;

    /// Types `text` into the element matching `selector`.
    async fn type_into(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Returns the page's current URL.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Returns the page's rendered HTML. Diagnostic use only.
    async fn content(&self) -> Result<String, DriverError>;
}

/// Returns the viewport center of the first element matching `selector`, or
/// `None` when no element matches.
///
/// Positioned clicks (login button, download link) go through this helper so
/// the click stays compatible with click-only flows instead of issuing a raw
/// navigation.
///
/// # Errors
///
/// Returns [`DriverError::Evaluation`] if the probe script fails or returns
/// a malformed value.
pub async fn element_center<D: PageDriver + ?Sized>(
    driver: &D,
    selector: &str,
) -> Result<Option<(f64, f64)>, DriverError> {
    // JSON-encode the selector so quoting inside it cannot break the script.
    let quoted = serde_json::Value::String(selector.to_owned()).to_string();
    let script = format!(
        "(() => {{ \
            const el = document.querySelector({quoted}); \
            if (!el) return null; \
            const r = el.getBoundingClientRect(); \
            return {{ x: r.x + r.width / 2, y: r.y + r.height / 2 }}; \
        }})()"
    );

    let value = driver.evaluate(&script).await?;
    if value.is_null() {
        return Ok(None);
    }

    let x = value.get("x").and_then(serde_json::Value::as_f64);
    let y = value.get("y").and_then(serde_json::Value::as_f64);
    match (x, y) {
        (Some(x), Some(y)) => Ok(Some((x, y))),
        _ => Err(DriverError::evaluation(format!(
            "bounding-box probe for {selector} returned {value}"
        ))),
    }
}
