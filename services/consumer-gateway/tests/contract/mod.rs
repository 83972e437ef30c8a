//! Shared set-up for the consumer contract tests.

mod task_client;
mod user_client;

use cdct_pact::{
    ContractRecorder, MockServerConfig, RequestMatcher, ResponseMatcher, Template, WriteMode,
};
use consumer_gateway::{GatewayResult, Resource, ResourceClient};
use rust_common::http::APPLICATION_JSON;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use test_utils::fixtures::bearer;
use test_utils::mocks::MockTokenProvider;

/// Directory the contract files are written to.
pub const PACT_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../target/pacts");

/// Mock provider listening on an ephemeral port.
pub fn mock_config() -> MockServerConfig {
    rust_common::init_test_tracing();
    MockServerConfig::ephemeral()
}

/// Client for the resource at `api_path` on the mock provider at `mock_url`,
/// authenticating with `token`.
pub fn client<R: Resource>(
    mock_url: &str,
    api_path: &str,
    token: &str,
) -> GatewayResult<ResourceClient<R>> {
    ResourceClient::new(
        reqwest::Client::new(),
        &format!("{mock_url}{api_path}"),
        Arc::new(MockTokenProvider::with_token(token)),
    )
}

/// Add the headers every provider call carries.
pub fn authorized(request: RequestMatcher, token: &str) -> RequestMatcher {
    request
        .header("Accept", APPLICATION_JSON)
        .header("Authorization", bearer(token))
}

/// `200` response with a JSON body.
pub fn json_ok(body: Template) -> ResponseMatcher {
    ResponseMatcher::status(200)
        .header("Content-Type", APPLICATION_JSON)
        .body(body)
}

/// Outcome of clearing [`PACT_DIR`], shared by every test in the binary.
static RESET: OnceLock<Result<(), String>> = OnceLock::new();

/// Remove contract files left by a previous run, once per test binary.
fn reset_pact_dir() -> anyhow::Result<()> {
    RESET
        .get_or_init(|| match std::fs::remove_dir_all(PACT_DIR) {
            Err(err) if err.kind() != ErrorKind::NotFound => {
                Err(format!("clearing {PACT_DIR}: {err}"))
            }
            _ => Ok(()),
        })
        .clone()
        .map_err(anyhow::Error::msg)
}

/// Merge the recorded interactions into this run's contract files.
pub fn persist(recorder: &ContractRecorder) -> anyhow::Result<()> {
    reset_pact_dir()?;
    recorder.persist(Path::new(PACT_DIR), WriteMode::Merge)?;
    Ok(())
}
