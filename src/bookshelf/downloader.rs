//! Item downloader: triggers one entry's download and confirms it through
//! the artifact watcher.

use std::time::Duration;

use tracing::{debug, trace};
use url::Url;

use super::BOOKSHELF_URL;
use super::types::{CatalogEntry, DownloadOutcome};
use super::watcher::{ArtifactWatcher, WatchError};
use crate::driver::{PageDriver, element_center};
use crate::session::Session;

/// The download affordance on an item's detail view.
const PDF_LINK_SELECTOR: &str = r#"a[href*="pdf"]"#;

/// How long to wait for the download affordance to render.
const AFFORDANCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads single catalog entries through an authenticated session.
///
/// Every failure folds into a [`DownloadOutcome`] so one broken item never
/// aborts the surrounding crawl. On [`DownloadOutcome::Confirmed`] exactly
/// one new artifact exists in the download directory; on any other outcome
/// none was attributed to the attempt (an in-progress file may remain and is
/// not cleaned up here).
pub struct ItemDownloader<'d, D: PageDriver> {
    session: Session<'d, D>,
    watcher: ArtifactWatcher,
    download_timeout: Duration,
    base: String,
}

impl<D: PageDriver> std::fmt::Debug for ItemDownloader<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemDownloader")
            .field("session", &self.session)
            .field("watcher", &self.watcher)
            .field("download_timeout", &self.download_timeout)
            .field("base", &self.base)
            .finish()
    }
}

impl<'d, D: PageDriver> ItemDownloader<'d, D> {
    /// Creates a downloader with the default per-item timeout.
    #[must_use]
    pub fn new(session: Session<'d, D>, watcher: ArtifactWatcher) -> Self {
        Self {
            session,
            watcher,
            download_timeout: super::watcher::DEFAULT_DOWNLOAD_TIMEOUT,
            base: BOOKSHELF_URL.to_owned(),
        }
    }

    /// Overrides the per-item download timeout.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidTimeout`] for a zero timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Result<Self, WatchError> {
        if timeout.is_zero() {
            return Err(WatchError::InvalidTimeout);
        }
        self.download_timeout = timeout;
        Ok(self)
    }

    /// Overrides the address item locators resolve against (tests, mirrors).
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Attempts to download one entry.
    ///
    /// Resolves the locator against the listing address, navigates to the
    /// detail view, waits for the PDF affordance (absence is
    /// [`DownloadOutcome::NotFound`] with no side effects), snapshots the
    /// download directory, clicks the affordance at its rendered position,
    /// and delegates completion detection to the watcher with the entry
    /// title as the match hint.
    pub async fn download_one(&self, entry: &CatalogEntry) -> DownloadOutcome {
        let url = match self.resolve(&entry.locator) {
            Ok(url) => url,
            Err(detail) => return DownloadOutcome::driver_error(detail),
        };

        let driver = self.session.driver();
        trace!(title = %entry.title, url = %url, "opening item detail view");
        if let Err(e) = driver.navigate(url.as_str()).await {
            return DownloadOutcome::driver_error(e.to_string());
        }

        match driver
            .wait_for_marker(PDF_LINK_SELECTOR, AFFORDANCE_TIMEOUT)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_marker_timeout() => {
                debug!(title = %entry.title, "no download affordance on detail view");
                return DownloadOutcome::NotFound;
            }
            Err(e) => return DownloadOutcome::driver_error(e.to_string()),
        }

        let (x, y) = match element_center(driver, PDF_LINK_SELECTOR).await {
            Ok(Some(center)) => center,
            // The affordance vanished between the marker wait and the probe.
            Ok(None) => return DownloadOutcome::NotFound,
            Err(e) => return DownloadOutcome::driver_error(e.to_string()),
        };

        // Exclusion set is captured before the trigger so anything confirmed
        // later appeared strictly after this point.
        let exclude = match self.watcher.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                return DownloadOutcome::driver_error(format!(
                    "cannot snapshot {}: {e}",
                    self.watcher.directory().display()
                ));
            }
        };

        // A positioned click, not a raw navigation: the affordance may be a
        // click-only download flow.
        if let Err(e) = driver.click(x, y).await {
            return DownloadOutcome::driver_error(e.to_string());
        }

        match self
            .watcher
            .await_artifact(&exclude, &entry.title, self.download_timeout)
            .await
        {
            Ok(outcome) => outcome,
            // Unreachable with a validated timeout, but never panic for it.
            Err(config) => DownloadOutcome::driver_error(config.to_string()),
        }
    }

    fn resolve(&self, locator: &str) -> Result<Url, String> {
        let base = Url::parse(&self.base).map_err(|e| format!("invalid base URL: {e}"))?;
        base.join(locator)
            .map_err(|e| format!("cannot resolve locator {locator}: {e}"))
    }
}
