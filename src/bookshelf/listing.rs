//! Listing fetcher: one bookshelf page in, catalog entries plus a has-more
//! flag out.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::BOOKSHELF_URL;
use super::types::{CatalogEntry, PageResult};
use crate::driver::{DriverError, PageDriver};
use crate::session::Session;

/// Marker element that signals the bookshelf list has rendered.
const LIST_MARKER: &str = "#hondana_list";

/// How long to wait for the list marker before the page is declared
/// unavailable.
const LIST_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Extraction script over the bookshelf selectors. One malformed row yields
/// an empty title or locator, never a page failure.
const LISTING_SCRIPT: &str = "\
(() => { \
  const rows = Array.from(document.querySelectorAll('.hondana_list01')); \
  const entries = rows.map((row) => { \
    const title = row.querySelector('.hondana_list_contents h3'); \
    const link = row.querySelector('.fancybox'); \
    return { \
      title: title && title.textContent ? title.textContent : '', \
      locator: link ? (link.getAttribute('href') || '') : '', \
    }; \
  }); \
  return { entries, has_next: document.querySelector('.next a') !== null }; \
})()";

/// Errors raised while fetching a listing page. All of them are fatal for
/// the current page and abort the remaining pagination; the driver is left
/// on the failed page and no stable state may be assumed.
#[derive(Debug, Error)]
pub enum ListingError {
    /// Page numbers start at 1.
    #[error("invalid listing page number {page}: pages start at 1")]
    InvalidPage {
        /// The rejected page number.
        page: u32,
    },

    /// The listing URL could not be constructed.
    #[error("invalid listing URL: {detail}")]
    InvalidUrl {
        /// Parse failure detail.
        detail: String,
    },

    /// The listing did not load: navigation failed or the list marker never
    /// appeared.
    #[error("listing unavailable on page {page}: {source}")]
    Unavailable {
        /// The page that failed to load.
        page: u32,
        /// The underlying driver failure.
        #[source]
        source: DriverError,
    },

    /// The extraction script returned data of an unexpected shape.
    #[error("listing page {page} returned malformed data: {detail}")]
    Malformed {
        /// The page whose data was unusable.
        page: u32,
        /// What was wrong with it.
        detail: String,
    },
}

impl ListingError {
    fn unavailable(page: u32, source: DriverError) -> Self {
        Self::Unavailable { page, source }
    }

    fn malformed(page: u32, detail: impl Into<String>) -> Self {
        Self::Malformed {
            page,
            detail: detail.into(),
        }
    }
}

/// Raw shape returned by [`LISTING_SCRIPT`].
#[derive(Debug, Deserialize)]
struct ListingSnapshot {
    entries: Vec<SnapshotEntry>,
    has_next: bool,
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    title: String,
    locator: String,
}

/// Fetches bookshelf listing pages through an authenticated session.
pub struct ListingFetcher<'d, D: PageDriver> {
    session: Session<'d, D>,
    base: String,
}

impl<'d, D: PageDriver> ListingFetcher<'d, D> {
    /// Creates a fetcher against the production bookshelf URL.
    #[must_use]
    pub fn new(session: Session<'d, D>) -> Self {
        Self::with_base_url(session, BOOKSHELF_URL)
    }

    /// Creates a fetcher against an explicit listing URL (tests, mirrors).
    #[must_use]
    pub fn with_base_url(session: Session<'d, D>, base: impl Into<String>) -> Self {
        Self {
            session,
            base: base.into(),
        }
    }

    /// Fetches one listing page.
    ///
    /// Navigates to the listing parameterized by `page` (with the fixed
    /// `q`/`sort` parameters), waits up to 30s for the list marker, and
    /// extracts title and locator for every rendered row. Titles are
    /// trimmed; a row missing its title yields an empty string rather than
    /// failing the page. `has_next` reflects the presence of a next-page
    /// affordance.
    ///
    /// # Errors
    ///
    /// Any [`ListingError`]; there is no retry inside this component.
    pub async fn fetch_page(&self, page: u32) -> Result<PageResult, ListingError> {
        if page == 0 {
            return Err(ListingError::InvalidPage { page });
        }

        let url = self.page_url(page)?;
        let driver = self.session.driver();

        driver
            .navigate(url.as_str())
            .await
            .map_err(|source| ListingError::unavailable(page, source))?;
        driver
            .wait_for_marker(LIST_MARKER, LIST_LOAD_TIMEOUT)
            .await
            .map_err(|source| ListingError::unavailable(page, source))?;

        let value = driver
            .evaluate(LISTING_SCRIPT)
            .await
            .map_err(|source| ListingError::unavailable(page, source))?;
        let snapshot: ListingSnapshot =
            serde_json::from_value(value).map_err(|e| ListingError::malformed(page, e.to_string()))?;

        let entries: Vec<CatalogEntry> = snapshot
            .entries
            .into_iter()
            .map(|raw| CatalogEntry {
                title: raw.title.trim().to_owned(),
                locator: raw.locator,
            })
            .collect();

        debug!(
            page,
            entries = entries.len(),
            has_next = snapshot.has_next,
            "fetched listing page"
        );
        Ok(PageResult::new(entries, snapshot.has_next))
    }

    fn page_url(&self, page: u32) -> Result<Url, ListingError> {
        let mut url = Url::parse(&self.base).map_err(|e| ListingError::InvalidUrl {
            detail: e.to_string(),
        })?;
        url.query_pairs_mut()
            .clear()
            .append_pair("q", "")
            .append_pair("sort", "s")
            .append_pair("page", &page.to_string());
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Listing double: records the navigated URL and replays a canned
    /// evaluate value; optionally never renders the list marker.
    struct ListingDriver {
        listing: serde_json::Value,
        marker_appears: bool,
        navigated: Mutex<Vec<String>>,
    }

    impl ListingDriver {
        fn returning(listing: serde_json::Value) -> Self {
            Self {
                listing,
                marker_appears: true,
                navigated: Mutex::new(Vec::new()),
            }
        }

        fn without_marker() -> Self {
            Self {
                listing: serde_json::Value::Null,
                marker_appears: false,
                navigated: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageDriver for ListingDriver {
        async fn navigate(&self, url: &str) -> Result<(), DriverError> {
            self.navigated.lock().unwrap().push(url.to_owned());
            Ok(())
        }
        async fn wait_for_marker(
            &self,
            selector: &str,
            timeout: Duration,
        ) -> Result<(), DriverError> {
            if self.marker_appears {
                Ok(())
            } else {
                Err(DriverError::marker_timeout(selector, timeout))
            }
        }
        async fn wait_for_navigation(&self, _timeout: Duration) -> Result<(), DriverError> {
            Ok(())
        }
        async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, DriverError> {
            Ok(self.listing.clone())
        }
        async fn click(&self, _x: f64, _y: f64) -> Result<(), DriverError> {
            Ok(())
        }
        async fn type_into(&self, _selector: &str, _text: &str) -> Result<(), DriverError> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String, DriverError> {
            Ok(String::new())
        }
        async fn content(&self) -> Result<String, DriverError> {
            Ok(String::new())
        }
    }

    fn listing_json() -> serde_json::Value {
        serde_json::json!({
            "entries": [
                { "title": "  Effective Reading  ", "locator": "showbook.php?b=1" },
                { "title": "", "locator": "showbook.php?b=2" },
            ],
            "has_next": true,
        })
    }

    #[tokio::test]
    async fn test_fetch_page_counts_and_trims() {
        let driver = ListingDriver::returning(listing_json());
        let session = Session::from_authenticated(&driver);
        let fetcher = ListingFetcher::new(session);

        let page = fetcher.fetch_page(1).await.unwrap();
        assert_eq!(page.total_on_page, page.entries.len());
        assert_eq!(page.total_on_page, 2);
        assert_eq!(page.entries[0].title, "Effective Reading");
        // A row without a readable title stays on the page with an empty
        // title instead of failing the fetch.
        assert_eq!(page.entries[1].title, "");
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn test_fetch_page_builds_parameterized_url() {
        let driver = ListingDriver::returning(listing_json());
        let session = Session::from_authenticated(&driver);
        let fetcher = ListingFetcher::new(session);

        fetcher.fetch_page(3).await.unwrap();

        let navigated = driver.navigated.lock().unwrap();
        assert_eq!(navigated.len(), 1);
        assert!(navigated[0].starts_with(BOOKSHELF_URL));
        assert!(navigated[0].contains("page=3"), "got {}", navigated[0]);
        assert!(navigated[0].contains("sort=s"), "got {}", navigated[0]);
    }

    #[tokio::test]
    async fn test_marker_timeout_is_unavailable() {
        let driver = ListingDriver::without_marker();
        let session = Session::from_authenticated(&driver);
        let fetcher = ListingFetcher::new(session);

        let err = fetcher.fetch_page(2).await.unwrap_err();
        match err {
            ListingError::Unavailable { page, source } => {
                assert_eq!(page, 2);
                assert!(source.is_marker_timeout());
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_listing_data_is_reported() {
        let driver = ListingDriver::returning(serde_json::json!({ "unexpected": true }));
        let session = Session::from_authenticated(&driver);
        let fetcher = ListingFetcher::new(session);

        let err = fetcher.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, ListingError::Malformed { page: 1, .. }));
    }

    #[tokio::test]
    async fn test_page_zero_rejected() {
        let driver = ListingDriver::returning(listing_json());
        let session = Session::from_authenticated(&driver);
        let fetcher = ListingFetcher::new(session);

        let err = fetcher.fetch_page(0).await.unwrap_err();
        assert!(matches!(err, ListingError::InvalidPage { page: 0 }));
    }
}
