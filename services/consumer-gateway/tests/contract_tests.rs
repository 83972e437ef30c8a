//! Consumer contract tests for the task and user providers.
//!
//! Every test runs the real gateway client against a mock provider and, on
//! success, merges its interaction into `target/pacts`. The directory is
//! cleared before the first write of each run, so interactions dropped from
//! the tests disappear from the contracts.

mod contract;
