//! Credential loading and validation.
//!
//! Credentials come from the `BOOKSCAN_USER_ID` and `BOOKSCAN_PASSWORD`
//! environment variables (a `.env` file is honored by the binary). There is
//! no hidden global holder: [`Credentials`] is an explicitly constructed
//! value validated at construction and passed by reference to whoever needs
//! it.

use thiserror::Error;

/// Environment variable holding the Bookscan account identifier.
pub const USER_ID_VAR: &str = "BOOKSCAN_USER_ID";

/// Environment variable holding the Bookscan account password.
pub const PASSWORD_VAR: &str = "BOOKSCAN_PASSWORD";

/// Errors raised while loading credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required credential variable is unset or empty.
    ///
    /// Fatal: the run aborts before any navigation happens.
    #[error("missing credentials: set the {variable} environment variable")]
    MissingCredentials {
        /// The environment variable that was unset or empty.
        variable: &'static str,
    },
}

impl AuthError {
    /// Creates a missing-credentials error for the given variable.
    pub fn missing(variable: &'static str) -> Self {
        Self::MissingCredentials { variable }
    }
}

/// A validated pair of Bookscan account credentials.
///
/// Both fields are guaranteed non-empty once constructed.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account identifier (typically the registered email address).
    pub user_id: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Builds credentials from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if either value is empty.
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Result<Self, AuthError> {
        let user_id = user_id.into();
        let password = password.into();
        if user_id.is_empty() {
            return Err(AuthError::missing(USER_ID_VAR));
        }
        if password.is_empty() {
            return Err(AuthError::missing(PASSWORD_VAR));
        }
        Ok(Self { user_id, password })
    }

    /// Loads credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] naming the first variable
    /// that is unset or empty.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads credentials through an injectable variable lookup.
    ///
    /// Used by [`Credentials::from_env`] and by tests, which must not mutate
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] naming the first variable
    /// the lookup could not supply a non-empty value for.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let user_id = lookup(USER_ID_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::missing(USER_ID_VAR))?;
        let password = lookup(PASSWORD_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::missing(PASSWORD_VAR))?;
        Ok(Self { user_id, password })
    }
}
