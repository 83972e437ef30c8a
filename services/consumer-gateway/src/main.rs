//! Consumer Gateway - Main Entry Point
//!
//! Serves task and user lookups backed by the provider services, with
//! structured logging and graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use consumer_gateway::api::{self, AppState};
use consumer_gateway::shutdown;
use consumer_gateway::{Config, TaskClient, UserClient};
use rust_common::{HttpConfig, StaticTokenProvider, TokenProvider, TracingConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let mut config = Config::from_env().context("invalid configuration")?;

    rust_common::init_tracing(
        &TracingConfig::default()
            .with_service_name("consumer-gateway")
            .with_log_level(config.log_level.clone())
            .with_json_output(config.log_json),
    );

    info!("Starting Consumer Gateway");

    let http = rust_common::build_http_client(
        &HttpConfig::default().with_timeout(config.request_timeout()),
    )
    .context("failed to build HTTP client")?;
    let tokens: Arc<dyn TokenProvider> =
        Arc::new(StaticTokenProvider::from_optional(config.access_token.take()));

    let state = Arc::new(AppState {
        tasks: TaskClient::new(http.clone(), config.task_api_url.as_str(), Arc::clone(&tokens))?,
        users: UserClient::new(http, config.user_api_url.as_str(), tokens)?,
    });

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %addr,
        task_api = %config.task_api_url,
        user_api = %config.user_api_url,
        "Consumer Gateway listening"
    );

    shutdown::serve(
        listener,
        api::router(state),
        shutdown::wait_for_signal(),
        config.shutdown_timeout(),
    )
    .await?;

    info!("Consumer Gateway stopped");

    Ok(())
}
