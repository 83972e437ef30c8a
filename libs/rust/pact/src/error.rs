//! Contract verification errors.
//!
//! Definition-time errors (`InvalidDefinition`, `UnresolvedStateParameter`,
//! `AmbiguousInteraction`) surface before any request is served. Exchange
//! errors (`RequestMismatch`, `MissingRequest`, `Timeout`) and assertion errors
//! fail the enclosing test; none of them leave an entry in the contract.

use crate::mock_server::UnmatchedRequest;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Contract verification error.
#[derive(Error, Debug)]
pub enum PactError {
    /// Interaction definition is malformed
    #[error("Invalid interaction definition: {0}")]
    InvalidDefinition(String),

    /// A state expression references a parameter the provider state does not declare
    #[error("State parameter '{parameter}' is not declared by provider state '{state}'")]
    UnresolvedStateParameter {
        /// Referenced parameter name
        parameter: String,
        /// Owning provider state
        state: String,
    },

    /// Two declared interactions can match the same request
    #[error("Ambiguous interactions: '{first}' and '{second}' match the same request")]
    AmbiguousInteraction {
        /// Description of the first interaction
        first: String,
        /// Description of the second interaction
        second: String,
    },

    /// The mock provider received requests matching no declared interaction
    #[error(
        "Request mismatch: {}",
        .requests.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    RequestMismatch {
        /// Every unmatched request, in arrival order
        requests: Vec<UnmatchedRequest>,
    },

    /// A declared interaction was never exercised
    #[error("Expected request was not received: {description}")]
    MissingRequest {
        /// Description of the unexercised interaction
        description: String,
    },

    /// The client under test did not complete in time
    #[error("Mock exchange timed out after {duration:?}")]
    Timeout {
        /// Configured exchange timeout
        duration: Duration,
    },

    /// Returned value does not conform to the response template
    #[error("Response body mismatch: {}", .mismatches.join("; "))]
    BodyMismatch {
        /// Human-readable mismatch descriptions
        mismatches: Vec<String>,
    },

    /// A caller-supplied assertion failed
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// Mock listener could not be bound
    #[error("Failed to bind mock provider on {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Contract file could not be read or written
    #[error("Contract file {path}: {source}")]
    ContractFile {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for contract verification.
pub type PactResult<T> = Result<T, PactError>;

impl PactError {
    /// Create an invalid definition error.
    #[must_use]
    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }

    /// Create an assertion failure.
    #[must_use]
    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::AssertionFailed(msg.into())
    }

    /// Whether the error was raised before any request was served.
    #[must_use]
    pub const fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDefinition(_)
                | Self::UnresolvedStateParameter { .. }
                | Self::AmbiguousInteraction { .. }
        )
    }

    pub(crate) fn bind(addr: impl fmt::Display, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_errors() {
        assert!(PactError::invalid_definition("bad").is_definition_error());
        assert!(
            PactError::AmbiguousInteraction {
                first: "a".to_string(),
                second: "b".to_string(),
            }
            .is_definition_error()
        );
        assert!(
            !PactError::Timeout {
                duration: Duration::from_secs(1)
            }
            .is_definition_error()
        );
    }

    #[test]
    fn test_request_mismatch_display() {
        let err = PactError::RequestMismatch {
            requests: vec![UnmatchedRequest {
                method: "GET".to_string(),
                path: "/api/task/2".to_string(),
                diffs: vec!["path: expected '/api/task/1', got '/api/task/2'".to_string()],
            }],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("GET /api/task/2"));
        assert!(rendered.contains("expected '/api/task/1'"));
    }
}
