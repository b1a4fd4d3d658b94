//! Crawl orchestrator: sequences pages and items and aggregates the run
//! summary.
//!
//! A run moves through `Paging` (fetch the current listing page),
//! `Downloading` (walk that page's entries sequentially), back to `Paging`
//! while `all_pages` is set and the listing reports more, and finally
//! `Done`. Authentication precedes the run entirely: a [`Crawler`] can only
//! be built from a [`Session`], and it never re-authenticates. No state is
//! retained across `run` invocations.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use super::downloader::ItemDownloader;
use super::listing::{ListingError, ListingFetcher};
use super::types::RunSummary;
use super::watcher::ArtifactWatcher;
use crate::driver::PageDriver;
use crate::session::Session;

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Items to download per page. Ignored when `all_pages` is set.
    pub limit_per_page: usize,
    /// First listing page to fetch.
    pub start_page: u32,
    /// Download every entry and paginate until the listing is exhausted.
    pub all_pages: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            limit_per_page: 1,
            start_page: 1,
            all_pages: false,
        }
    }
}

/// A run-fatal listing failure.
///
/// Item-level failures never escalate to this; only the listing (or its
/// page marker) failing aborts the remaining pagination. The partial
/// [`RunSummary`] travels with the error so callers can still report what
/// was attempted before the abort.
#[derive(Debug, Error)]
#[error("crawl aborted on page {page}: {source}")]
pub struct CrawlError {
    /// The page whose listing failed.
    pub page: u32,
    /// Counts accumulated before the abort.
    pub summary: RunSummary,
    /// The underlying listing failure.
    #[source]
    pub source: ListingError,
}

/// Drives a whole crawl: listing pages in, downloaded artifacts and a
/// [`RunSummary`] out.
pub struct Crawler<'d, D: PageDriver> {
    fetcher: ListingFetcher<'d, D>,
    downloader: ItemDownloader<'d, D>,
}

impl<'d, D: PageDriver> Crawler<'d, D> {
    /// Creates a crawler downloading into `download_dir`.
    #[must_use]
    pub fn new(session: Session<'d, D>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher: ListingFetcher::new(session),
            downloader: ItemDownloader::new(session, ArtifactWatcher::new(download_dir)),
        }
    }

    /// Creates a crawler from explicitly configured components.
    #[must_use]
    pub fn with_components(
        fetcher: ListingFetcher<'d, D>,
        downloader: ItemDownloader<'d, D>,
    ) -> Self {
        Self { fetcher, downloader }
    }

    /// Runs one crawl.
    ///
    /// Fetches `start_page`, downloads up to `limit_per_page` entries from
    /// it (all entries in `all_pages` mode) strictly sequentially, and
    /// continues to the next page while `all_pages` is set and the listing
    /// reports more. Every item outcome is recorded in the summary; item
    /// failures are logged and the run continues.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] when a listing page cannot be fetched; the
    /// error carries the counts accumulated so far.
    pub async fn run(&self, config: &RunConfig) -> Result<RunSummary, CrawlError> {
        let mut summary = RunSummary::default();
        let mut page_number = config.start_page;

        loop {
            let page = self
                .fetcher
                .fetch_page(page_number)
                .await
                .map_err(|source| CrawlError {
                    page: page_number,
                    summary: summary.clone(),
                    source,
                })?;
            summary.last_page_visited = page_number;

            let take = if config.all_pages {
                page.entries.len()
            } else {
                config.limit_per_page.min(page.entries.len())
            };
            info!(
                page = page_number,
                on_page = page.total_on_page,
                downloading = take,
                "processing listing page"
            );

            // Entries are consumed on the page that produced them; no
            // parallel downloads against the single driver session.
            for entry in &page.entries[..take] {
                let outcome = self.downloader.download_one(entry).await;
                summary.record(&outcome);
                if outcome.is_confirmed() {
                    info!(title = %entry.title, ?outcome, "download confirmed");
                } else {
                    warn!(title = %entry.title, ?outcome, "download failed");
                }
            }

            if config.all_pages && page.has_next {
                page_number += 1;
            } else {
                break;
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.limit_per_page, 1);
        assert_eq!(config.start_page, 1);
        assert!(!config.all_pages);
    }
}
