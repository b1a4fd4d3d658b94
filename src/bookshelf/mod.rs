//! The crawl core: paginated bookshelf crawl and per-item download
//! confirmation.
//!
//! Components, leaves first:
//! - [`ArtifactWatcher`] - watches the download directory for a new,
//!   fully-written PDF and resolves against a bounded, race-tolerant wait
//! - [`ListingFetcher`] - turns a page number into a page of catalog entries
//!   plus a has-more flag
//! - [`ItemDownloader`] - triggers one item's download and confirms it
//!   through the watcher
//! - [`Crawler`] - sequences pages and items and aggregates the run summary

mod downloader;
mod listing;
mod orchestrator;
mod types;
mod watcher;

pub use downloader::ItemDownloader;
pub use listing::{ListingError, ListingFetcher};
pub use orchestrator::{CrawlError, Crawler, RunConfig};
pub use types::{CatalogEntry, DownloadOutcome, PageResult, RunSummary};
pub use watcher::{ARTIFACT_EXTENSION, ArtifactWatcher, IN_PROGRESS_EXTENSION, WatchError};

/// Base address the bookshelf and item locators resolve against.
pub const BASE_URL: &str = "https://system.bookscan.co.jp";

/// The paginated bookshelf listing.
pub const BOOKSHELF_URL: &str = "https://system.bookscan.co.jp/mypage/bookshelf_all_list.php";
