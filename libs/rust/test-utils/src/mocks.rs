//! Mock implementations for testing.

use rust_common::{PlatformError, TokenProvider};
use secrecy::SecretString;
use std::sync::{PoisonError, RwLock};

/// Token provider whose token can be swapped between requests.
///
/// Contract tests prepare tokens with different roles and set the one an
/// interaction expects before exercising the client.
#[derive(Debug, Default)]
pub struct MockTokenProvider {
    token: RwLock<Option<String>>,
}

impl MockTokenProvider {
    /// Create a provider without a token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        let provider = Self::new();
        provider.set_token(token);
        provider
    }

    /// Replace the current token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Remove the current token.
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenProvider for MockTokenProvider {
    fn bearer_token(&self) -> Result<SecretString, PlatformError> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(SecretString::from)
            .ok_or_else(|| PlatformError::auth_failed("mock token not set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_mock_token_provider() {
        let provider = MockTokenProvider::new();
        assert!(provider.bearer_token().unwrap_err().is_auth_failure());

        provider.set_token("first");
        assert_eq!(provider.bearer_token().unwrap().expose_secret(), "first");

        provider.set_token("second");
        assert_eq!(provider.bearer_token().unwrap().expose_secret(), "second");

        provider.clear();
        assert!(provider.bearer_token().is_err());
    }
}
