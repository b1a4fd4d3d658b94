//! Bookscan Downloader Core Library
//!
//! This library crawls a Bookscan bookshelf through a headless browser and
//! downloads each book's PDF into a local directory. Download completion has
//! no explicit callback from the browser, so the core reconciles a
//! side-effect-only signal (a file appearing in the download directory) with
//! a bounded, race-tolerant wait.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Credential loading and validation
//! - [`driver`] - Capability trait over the remote browser page, plus the
//!   chromiumoxide-backed implementation
//! - [`session`] - Login flow producing an authenticated driver handle
//! - [`bookshelf`] - The crawl core: listing fetcher, download completion
//!   detector, item downloader, and crawl orchestrator
//!
//! Driver access is strictly sequential: every component borrows the same
//! [`session::Session`], and nothing in this crate issues two driver
//! operations concurrently.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod bookshelf;
pub mod driver;
pub mod session;

// Re-export commonly used types
pub use auth::{AuthError, Credentials};
pub use bookshelf::{
    ArtifactWatcher, CatalogEntry, CrawlError, Crawler, DownloadOutcome, ItemDownloader,
    ListingError, ListingFetcher, PageResult, RunConfig, RunSummary, WatchError,
};
pub use driver::{DriverError, PageDriver};
pub use session::{Session, SessionError};
