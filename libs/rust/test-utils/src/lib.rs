//! Shared test utilities for the consumer gateway.
//!
//! This crate provides:
//! - Proptest generators for tasks, users and access tokens
//! - A settable token provider mock
//! - Fixtures with the example values used by the consumer contract tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
