//! Centralized error types shared by the gateway crates.
//!
//! Downstream calls are single-attempt, so errors carry a classification for
//! how they should surface to callers rather than whether to retry them.

use thiserror::Error;

/// Common error type for platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// No bearer token could be obtained
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PlatformError {
    /// Check if this error originates from missing or rejected credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::auth_failed("no token configured");
    /// assert!(err.is_auth_failure());
    ///
    /// let err = PlatformError::invalid_input("zero timeout");
    /// assert!(!err.is_auth_failure());
    /// ```
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed(_))
    }

    /// Create an authentication failure with the given message.
    #[must_use]
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthFailed(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
