//! Data model for the crawl core.

/// One book on the bookshelf listing.
///
/// Immutable once produced by the listing fetcher; an entry is only ever
/// consumed on the page it was produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Trimmed title. Empty when the listing row had no readable title;
    /// a malformed row never fails the whole page.
    pub title: String,
    /// Opaque, driver-relative reference resolvable to the item's detail
    /// view.
    pub locator: String,
}

/// One fetched page of the bookshelf listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// Entries in listing order.
    pub entries: Vec<CatalogEntry>,
    /// Number of entries rendered on this page. Always equals
    /// `entries.len()`.
    pub total_on_page: usize,
    /// Whether a next-page affordance was present.
    pub has_next: bool,
}

impl PageResult {
    /// Builds a page result; `total_on_page` is derived from the entries.
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>, has_next: bool) -> Self {
        let total_on_page = entries.len();
        Self {
            entries,
            total_on_page,
            has_next,
        }
    }
}

/// Result of one item download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A new artifact appeared in the watched directory after the trigger.
    Confirmed {
        /// File name of the artifact (not a full path).
        artifact: String,
    },
    /// The wait window elapsed and the artifact could not be attributed to
    /// this attempt.
    TimedOut,
    /// The downloadable resource is absent (no download affordance, or no
    /// matching artifact after the late-check).
    NotFound,
    /// A driver or filesystem operation failed mid-attempt.
    DriverError {
        /// Human-readable failure detail.
        detail: String,
    },
}

impl DownloadOutcome {
    /// Creates a confirmed outcome.
    pub fn confirmed(artifact: impl Into<String>) -> Self {
        Self::Confirmed {
            artifact: artifact.into(),
        }
    }

    /// Creates a driver-error outcome.
    pub fn driver_error(detail: impl Into<String>) -> Self {
        Self::DriverError {
            detail: detail.into(),
        }
    }

    /// Whether the download was confirmed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// Aggregated counts for one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items for which a download was attempted.
    pub attempted: usize,
    /// Attempts that ended in [`DownloadOutcome::Confirmed`].
    pub succeeded: usize,
    /// Attempts that ended in any other outcome.
    pub failed: usize,
    /// The last page whose listing was fetched successfully.
    pub last_page_visited: u32,
}

impl RunSummary {
    /// Records one item outcome.
    pub(crate) fn record(&mut self, outcome: &DownloadOutcome) {
        self.attempted += 1;
        if outcome.is_confirmed() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}
