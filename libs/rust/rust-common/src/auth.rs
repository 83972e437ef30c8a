//! Bearer token seam for OAuth2-authenticated downstream calls.
//!
//! Token acquisition lives outside the gateway. Clients only ask a
//! [`TokenProvider`] for the current access token and attach it as an
//! `Authorization: Bearer` header.

use crate::error::PlatformError;
use secrecy::{ExposeSecret, SecretString};

/// Source of the bearer token attached to downstream requests.
pub trait TokenProvider: Send + Sync {
    /// Return the access token to send with the next request.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::AuthFailed`] when no token is available.
    fn bearer_token(&self) -> Result<SecretString, PlatformError>;
}

/// Token provider returning a fixed, externally acquired access token.
pub struct StaticTokenProvider {
    token: Option<SecretString>,
}

impl StaticTokenProvider {
    /// Create a provider for the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
        }
    }

    /// Create a provider from an optional token, e.g. an unset environment variable.
    #[must_use]
    pub const fn from_optional(token: Option<SecretString>) -> Self {
        Self { token }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("configured", &self.token.is_some())
            .finish()
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Result<SecretString, PlatformError> {
        match &self.token {
            Some(token) if !token.expose_secret().is_empty() => {
                Ok(SecretString::from(token.expose_secret().to_owned()))
            }
            _ => Err(PlatformError::auth_failed("no bearer token configured")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_is_returned() {
        let provider = StaticTokenProvider::new("abc.def.ghi");
        let token = provider.bearer_token().unwrap();
        assert_eq!(token.expose_secret(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_token_is_auth_failure() {
        let provider = StaticTokenProvider::from_optional(None);
        assert!(provider.bearer_token().unwrap_err().is_auth_failure());

        let provider = StaticTokenProvider::new("");
        assert!(provider.bearer_token().is_err());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let provider = StaticTokenProvider::new("super-secret");
        let rendered = format!("{provider:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("configured: true"));
    }
}
