//! Scripted [`PageDriver`] double for integration tests.
//!
//! The fake replays a fixed bookshelf: listing pages keyed by page number
//! and detail views keyed by locator. Clicking a detail view's download
//! affordance writes the configured artifact into the download directory,
//! which is exactly the side-effect-only completion signal the crawl core
//! watches for.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bookscan_core::driver::{DriverError, PageDriver};
use url::Url;

/// One scripted listing page.
#[derive(Debug, Clone)]
pub struct PageFixture {
    /// `(title, locator)` pairs in listing order.
    pub entries: Vec<(String, String)>,
    /// Whether the page advertises a next page.
    pub has_next: bool,
}

#[derive(Debug, Default)]
struct State {
    current_url: String,
    pages: HashMap<u32, PageFixture>,
    unavailable_pages: HashSet<u32>,
    /// locator -> artifact file name written on click; `None` means the
    /// detail view renders no download affordance.
    details: HashMap<String, Option<String>>,
    download_dir: Option<PathBuf>,
    clicks: usize,
}

/// A deterministic, in-memory bookshelf behind the driver capability trait.
#[derive(Debug, Default)]
pub struct FakeDriver {
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a listing page.
    pub fn with_listing(self, page: u32, entries: &[(&str, &str)], has_next: bool) -> Self {
        self.state.lock().unwrap().pages.insert(
            page,
            PageFixture {
                entries: entries
                    .iter()
                    .map(|(t, l)| ((*t).to_owned(), (*l).to_owned()))
                    .collect(),
                has_next,
            },
        );
        self
    }

    /// Makes a listing page's marker never appear.
    pub fn with_unavailable_page(self, page: u32) -> Self {
        self.state.lock().unwrap().unavailable_pages.insert(page);
        self
    }

    /// Scripts a detail view; `artifact` is the file written on click, or
    /// `None` for a view without a download affordance.
    pub fn with_detail(self, locator: &str, artifact: Option<&str>) -> Self {
        self.state
            .lock()
            .unwrap()
            .details
            .insert(locator.to_owned(), artifact.map(str::to_owned));
        self
    }

    /// Directory artifact files are written into.
    pub fn with_download_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.state.lock().unwrap().download_dir = Some(dir.into());
        self
    }

    /// Number of coordinate clicks issued so far.
    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    /// Page number from the current listing URL.
    fn current_page(state: &State) -> Option<u32> {
        let url = Url::parse(&state.current_url).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    }

    /// Detail fixture matching the current URL, if any.
    fn current_detail(state: &State) -> Option<Option<String>> {
        state
            .details
            .iter()
            .find(|(locator, _)| state.current_url.contains(locator.as_str()))
            .map(|(_, artifact)| artifact.clone())
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.state.lock().unwrap().current_url = url.to_owned();
        Ok(())
    }

    async fn wait_for_marker(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let state = self.state.lock().unwrap();
        if selector == "#hondana_list" {
            let page = Self::current_page(&state)
                .ok_or_else(|| DriverError::session("not on a listing URL"))?;
            if state.unavailable_pages.contains(&page) || !state.pages.contains_key(&page) {
                return Err(DriverError::marker_timeout(selector, timeout));
            }
            return Ok(());
        }
        if selector.contains("pdf") {
            return match Self::current_detail(&state) {
                Some(Some(_)) => Ok(()),
                _ => Err(DriverError::marker_timeout(selector, timeout)),
            };
        }
        Ok(())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let state = self.state.lock().unwrap();
        if script.contains("hondana_list01") {
            let page = Self::current_page(&state)
                .ok_or_else(|| DriverError::session("not on a listing URL"))?;
            let fixture = state
                .pages
                .get(&page)
                .ok_or_else(|| DriverError::evaluation(format!("no fixture for page {page}")))?;
            let entries: Vec<serde_json::Value> = fixture
                .entries
                .iter()
                .map(|(title, locator)| {
                    serde_json::json!({ "title": title, "locator": locator })
                })
                .collect();
            return Ok(serde_json::json!({
                "entries": entries,
                "has_next": fixture.has_next,
            }));
        }
        if script.contains("getBoundingClientRect") {
            return Ok(match Self::current_detail(&state) {
                Some(Some(_)) => serde_json::json!({ "x": 320.0, "y": 480.0 }),
                _ => serde_json::Value::Null,
            });
        }
        Ok(serde_json::Value::Null)
    }

    async fn click(&self, _x: f64, _y: f64) -> Result<(), DriverError> {
        let (artifact, dir) = {
            let mut state = self.state.lock().unwrap();
            state.clicks += 1;
            (Self::current_detail(&state).flatten(), state.download_dir.clone())
        };
        if let (Some(name), Some(dir)) = (artifact, dir) {
            std::fs::write(dir.join(&name), b"%PDF-1.4")
                .map_err(|e| DriverError::session(e.to_string()))?;
        }
        Ok(())
    }

    async fn type_into(&self, _selector: &str, _text: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().current_url.clone())
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok(String::new())
    }
}
