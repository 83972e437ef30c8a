//! Shared library for cross-cutting concerns of the consumer gateway.
//!
//! This crate provides centralized implementations for:
//! - Platform error types
//! - HTTP client configuration and building for downstream provider calls
//! - Tracing subscriber initialization
//! - The bearer token seam used for OAuth2-authenticated requests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod http;
pub mod tracing_config;

pub use auth::{StaticTokenProvider, TokenProvider};
pub use error::PlatformError;
pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{TracingConfig, init_test_tracing, init_tracing};
