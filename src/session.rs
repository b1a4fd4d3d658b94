//! Authenticated driver session.
//!
//! [`Session`] is the only handle the crawl core accepts, and it can only be
//! produced by completing the login flow (or by an embedder that vouches for
//! an already-authenticated driver). It is a borrowed, copyable wrapper:
//! the driver has exactly one owner, and every component downstream works
//! through the same borrow, which keeps driver access strictly sequential.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::Credentials;
use crate::driver::{DriverError, PageDriver, element_center};

/// Bookscan login page.
pub const LOGIN_URL: &str = "https://system.bookscan.co.jp/mypage/login.php";

const EMAIL_SELECTOR: &str = r#"input[name="email"]"#;
const PASSWORD_SELECTOR: &str = r#"input[name="password"]"#;
const LOGIN_BUTTON_SELECTOR: &str = "#login-btn";

/// How long to wait for each login form field to appear.
const LOGIN_FORM_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the post-login navigation.
const LOGIN_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while establishing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The login form was submitted but the site kept us on the login page.
    ///
    /// Fatal for the run: the session is unusable.
    #[error("login rejected: still on {url} after submitting credentials")]
    LoginRejected {
        /// The URL the driver ended up on.
        url: String,
    },

    /// A driver operation failed during login.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// A non-owning handle to an authenticated driver.
///
/// Copyable so the fetcher, downloader, and orchestrator can each hold one
/// without cloning or sharing the driver itself.
pub struct Session<'d, D: PageDriver> {
    driver: &'d D,
}

impl<D: PageDriver> std::fmt::Debug for Session<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl<D: PageDriver> Clone for Session<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: PageDriver> Copy for Session<'_, D> {}

impl<'d, D: PageDriver> Session<'d, D> {
    /// Logs in to Bookscan and returns the authenticated session.
    ///
    /// Navigates to the login page, waits for the email and password fields,
    /// types the credentials, clicks the login button at its rendered
    /// position, and waits for the resulting navigation. Ending up back on
    /// the login page means the credentials were rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::LoginRejected`] when the site refuses the
    /// credentials, or [`SessionError::Driver`] when a driver operation
    /// fails.
    pub async fn establish(
        driver: &'d D,
        credentials: &Credentials,
    ) -> Result<Session<'d, D>, SessionError> {
        info!("logging in to Bookscan");
        driver.navigate(LOGIN_URL).await?;
        driver
            .wait_for_marker(EMAIL_SELECTOR, LOGIN_FORM_TIMEOUT)
            .await?;
        driver
            .wait_for_marker(PASSWORD_SELECTOR, LOGIN_FORM_TIMEOUT)
            .await?;

        driver.type_into(EMAIL_SELECTOR, &credentials.user_id).await?;
        driver
            .type_into(PASSWORD_SELECTOR, &credentials.password)
            .await?;

        let (x, y) = element_center(driver, LOGIN_BUTTON_SELECTOR)
            .await?
            .ok_or_else(|| {
                DriverError::input(LOGIN_BUTTON_SELECTOR, "login button has no position")
            })?;
        driver.click(x, y).await?;
        driver.wait_for_navigation(LOGIN_NAVIGATION_TIMEOUT).await?;

        let url = driver.current_url().await?;
        if url.contains("login.php") {
            return Err(SessionError::LoginRejected { url });
        }

        debug!(url, "login succeeded");
        Ok(Session { driver })
    }

    /// Wraps a driver the caller has already authenticated elsewhere.
    ///
    /// The caller guarantees the login flow has completed; the crawl core
    /// never re-authenticates.
    pub fn from_authenticated(driver: &'d D) -> Session<'d, D> {
        Session { driver }
    }

    /// The underlying driver.
    #[must_use]
    pub fn driver(&self) -> &'d D {
        self.driver
    }
}
