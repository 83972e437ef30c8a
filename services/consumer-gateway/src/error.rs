//! Gateway errors and their HTTP representation.

use crate::config::ConfigError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_common::PlatformError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Gateway error.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The provider refused the gateway's token (HTTP 403)
    #[error("Insufficient authentication to access {resource} API")]
    InsufficientAuthentication {
        /// Resource name
        resource: &'static str,
    },

    /// The provider answered with a non-2xx status other than 403
    #[error("{resource} API responded with status {status}")]
    UnmappedTransportFailure {
        /// Response status
        status: u16,
        /// Resource name
        resource: &'static str,
    },

    /// Transport failure talking to the provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider body did not decode
    #[error("Failed to decode provider response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Token or client set-up failure
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Provider refused the gateway's credentials
    AuthInsufficient,
    /// Provider failed or answered unexpectedly
    UpstreamFailure,
    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthInsufficient => "AUTH_INSUFFICIENT",
            Self::UpstreamFailure => "UPSTREAM_FAILURE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status for this code
    #[must_use]
    pub const fn http_status(self) -> StatusCode {
        match self {
            Self::AuthInsufficient => StatusCode::FORBIDDEN,
            Self::UpstreamFailure => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Error code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

impl GatewayError {
    /// Get the error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InsufficientAuthentication { .. } => ErrorCode::AuthInsufficient,
            Self::UnmappedTransportFailure { .. } | Self::Http(_) | Self::Deserialization(_) => {
                ErrorCode::UpstreamFailure
            }
            Self::Platform(_) | Self::Config(_) => ErrorCode::Internal,
        }
    }

    /// Whether the provider refused the gateway's credentials.
    #[must_use]
    pub const fn is_insufficient_authentication(&self) -> bool {
        matches!(self, Self::InsufficientAuthentication { .. })
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = match code {
            ErrorCode::Internal => {
                error!(error = %self, "request failed");
                "Internal error".to_string()
            }
            ErrorCode::AuthInsufficient | ErrorCode::UpstreamFailure => {
                warn!(error = %self, code = code.as_str(), "upstream request failed");
                self.to_string()
            }
        };

        let body = ErrorBody {
            code: code.as_str(),
            message,
        };
        (code.http_status(), Json(body)).into_response()
    }
}
