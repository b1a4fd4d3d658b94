//! Download completion detection.
//!
//! The browser gives no "download finished" callback; the only observable
//! signal is a file appearing in the download directory. [`ArtifactWatcher`]
//! turns that into a bounded wait: poll the directory for a new,
//! fully-written artifact, and on timeout run exactly one late-check so a
//! write completing between the last poll and the timer firing is not
//! falsely reported as a failure.
//!
//! The poll loop and the timeout are one cancellable unit: the poll future
//! runs under a single owning [`tokio::time::timeout`], so cancelling the
//! wait cancels the ticks with it and no orphaned timer survives.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::types::DownloadOutcome;

/// Extension of a fully-written artifact.
pub const ARTIFACT_EXTENSION: &str = ".pdf";

/// Extension Chrome appends while a download is still in flight.
pub const IN_PROGRESS_EXTENSION: &str = ".crdownload";

/// Default directory poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default per-item wait for an artifact to appear.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration errors for the watcher. These fail fast; they are never
/// folded into a [`DownloadOutcome`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchError {
    /// The poll interval must be positive.
    #[error("poll interval must be positive")]
    InvalidInterval,

    /// The wait timeout must be positive.
    #[error("download timeout must be positive")]
    InvalidTimeout,
}

/// Watches a download directory for new, fully-written artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactWatcher {
    dir: PathBuf,
    poll_interval: Duration,
}

impl ArtifactWatcher {
    /// Creates a watcher over `dir` with the default 1s poll interval.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Creates a watcher with an explicit poll interval.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidInterval`] for a zero interval.
    pub fn with_poll_interval(
        dir: impl Into<PathBuf>,
        poll_interval: Duration,
    ) -> Result<Self, WatchError> {
        if poll_interval.is_zero() {
            return Err(WatchError::InvalidInterval);
        }
        Ok(Self {
            dir: dir.into(),
            poll_interval,
        })
    }

    /// The watched directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Captures the current set of file names in the directory.
    ///
    /// Callers take this snapshot **before** the triggering action so the
    /// exclusion set is atomic with respect to the trigger: anything the
    /// watcher later attributes to the attempt appeared strictly after this
    /// call.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the directory is unreadable.
    pub async fn snapshot(&self) -> io::Result<HashSet<String>> {
        Ok(self.list().await?.into_iter().collect())
    }

    /// Polls the directory until a new artifact appears or `timeout`
    /// elapses.
    ///
    /// A file qualifies when it is not in `exclude`, carries the complete
    /// artifact extension, and does not carry the in-progress extension.
    /// Enumeration order is unspecified; the first qualifying file wins.
    ///
    /// Returns [`DownloadOutcome::Confirmed`] or [`DownloadOutcome::TimedOut`];
    /// an unreadable directory folds into [`DownloadOutcome::DriverError`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidTimeout`] for a zero timeout.
    pub async fn poll_for_artifact(
        &self,
        exclude: &HashSet<String>,
        timeout: Duration,
    ) -> Result<DownloadOutcome, WatchError> {
        if timeout.is_zero() {
            return Err(WatchError::InvalidTimeout);
        }

        let poll = async {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.first_new_artifact(exclude).await {
                    Ok(Some(name)) => return DownloadOutcome::confirmed(name),
                    Ok(None) => trace!(dir = %self.dir.display(), "no new artifact yet"),
                    Err(e) => {
                        return DownloadOutcome::driver_error(format!(
                            "cannot read {}: {e}",
                            self.dir.display()
                        ));
                    }
                }
            }
        };

        // The owning timer: expiry cancels the poll future and its ticker.
        match tokio::time::timeout(timeout, poll).await {
            Ok(outcome) => Ok(outcome),
            Err(_elapsed) => Ok(DownloadOutcome::TimedOut),
        }
    }

    /// Waits for an artifact, tolerating the race between timer expiry and
    /// write completion.
    ///
    /// Runs [`Self::poll_for_artifact`]; when the window elapses, performs
    /// exactly one late-check for a file that slipped in between the last
    /// poll and the timeout, filtered by `match_hint` (substring match
    /// against the expected title, never broadened to "any new PDF"). A
    /// late match is [`DownloadOutcome::Confirmed`]; otherwise the attempt
    /// resolves to [`DownloadOutcome::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidTimeout`] for a zero timeout.
    pub async fn await_artifact(
        &self,
        exclude: &HashSet<String>,
        match_hint: &str,
        timeout: Duration,
    ) -> Result<DownloadOutcome, WatchError> {
        match self.poll_for_artifact(exclude, timeout).await? {
            DownloadOutcome::TimedOut => {
                debug!(
                    hint = match_hint,
                    ?timeout,
                    "wait window elapsed, running late-check"
                );
                match self.late_check(exclude, match_hint).await {
                    Ok(Some(name)) => {
                        debug!(artifact = %name, "late-check matched a finished download");
                        Ok(DownloadOutcome::confirmed(name))
                    }
                    Ok(None) => Ok(DownloadOutcome::NotFound),
                    Err(e) => Ok(DownloadOutcome::driver_error(format!(
                        "cannot read {}: {e}",
                        self.dir.display()
                    ))),
                }
            }
            other => Ok(other),
        }
    }

    /// First file that is new, complete, and not excluded.
    async fn first_new_artifact(&self, exclude: &HashSet<String>) -> io::Result<Option<String>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|name| !exclude.contains(name) && is_complete_artifact(name)))
    }

    /// Single post-timeout re-check, additionally filtered by the title
    /// hint.
    async fn late_check(
        &self,
        exclude: &HashSet<String>,
        match_hint: &str,
    ) -> io::Result<Option<String>> {
        Ok(self.list().await?.into_iter().find(|name| {
            !exclude.contains(name) && is_complete_artifact(name) && name.contains(match_hint)
        }))
    }

    async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

fn is_complete_artifact(name: &str) -> bool {
    name.ends_with(ARTIFACT_EXTENSION) && !name.ends_with(IN_PROGRESS_EXTENSION)
}
