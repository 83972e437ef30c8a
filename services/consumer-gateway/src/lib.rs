//! Consumer gateway.
//!
//! Forwards task and user lookups to the provider services with the
//! gateway's OAuth2 bearer token and exposes them under `/api`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod shutdown;

pub use client::{ResourceClient, TaskClient, UserClient};
pub use config::{Config, ConfigError};
pub use domain::{Resource, Task, User};
pub use error::{ErrorCode, GatewayError, GatewayResult};
