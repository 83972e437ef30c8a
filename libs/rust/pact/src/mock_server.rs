//! Mock provider engine.
//!
//! Serves a fixed set of interactions over HTTP on a local listener. Every
//! request is matched against the declared interactions; a unique match is
//! answered with a body synthesized from its template, anything else gets a
//! 500 and is recorded as a mismatch for [`MockServerHandle::verify`].

use crate::error::{PactError, PactResult};
use crate::interaction::{ExpectedRequest, Interaction};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Mock provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockServerConfig {
    /// Listener host
    pub host: String,
    /// Listener port; 0 picks an ephemeral port
    pub port: u16,
    /// Time allowed for the client under test to complete its exchange
    pub request_timeout: Duration,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8888,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl MockServerConfig {
    /// Config bound to an ephemeral port, for tests running in parallel.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self::default().with_port(0)
    }

    /// Set the listener host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the listener port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the exchange timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A request that no declared interaction matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedRequest {
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Differences against the closest declared interaction
    pub diffs: Vec<String>,
}

impl fmt::Display for UnmatchedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.method, self.path, self.diffs.join(", "))
    }
}

struct Entry {
    interaction: Interaction,
    expected: ExpectedRequest,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
}

#[derive(Default)]
struct ExchangeLog {
    served: Vec<usize>,
    mismatches: Vec<UnmatchedRequest>,
    ambiguities: Vec<(String, String)>,
}

struct MockState {
    entries: Vec<Entry>,
    log: Mutex<ExchangeLog>,
    exchange: tokio::sync::Mutex<()>,
}

impl MockState {
    fn log(&self) -> std::sync::MutexGuard<'_, ExchangeLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Entry point for starting mock providers.
pub struct MockServer;

impl MockServer {
    /// Validate the interactions and start serving them.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::AmbiguousInteraction`] if two interactions can match
    /// the same request and [`PactError::Bind`] if the listener cannot be bound.
    pub async fn start(
        interactions: Vec<Interaction>,
        config: &MockServerConfig,
    ) -> PactResult<MockServerHandle> {
        let entries: Vec<Entry> = interactions
            .into_iter()
            .map(|interaction| Entry {
                expected: interaction.expected_request(),
                headers: interaction.response.effective_headers(),
                body: interaction.generated_body(),
                interaction,
            })
            .collect();

        for (i, first) in entries.iter().enumerate() {
            if let Some(second) = entries[i + 1..]
                .iter()
                .find(|other| first.expected.overlaps(&other.expected))
            {
                return Err(PactError::AmbiguousInteraction {
                    first: first.interaction.description.clone(),
                    second: second.interaction.description.clone(),
                });
            }
        }

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| PactError::bind(&bind_addr, source))?;
        let addr = listener
            .local_addr()
            .map_err(|source| PactError::bind(&bind_addr, source))?;

        let state = Arc::new(MockState {
            entries,
            log: Mutex::new(ExchangeLog::default()),
            exchange: tokio::sync::Mutex::new(()),
        });
        let app = Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&state));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(error) = server.await {
                warn!(%error, "mock provider stopped with error");
            }
        });

        info!(%addr, interactions = state.entries.len(), "mock provider started");

        Ok(MockServerHandle {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

/// Running mock provider. Dropping the handle tears the listener down.
pub struct MockServerHandle {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MockServerHandle {
    /// Base URL of the mock provider, e.g. `http://127.0.0.1:8888`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL for `path` on the mock provider.
    #[must_use]
    pub fn base_url(&self, path: &str) -> String {
        format!("{}{path}", self.url())
    }

    /// Bound socket address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Descriptions of the interactions served so far, in order.
    #[must_use]
    pub fn served(&self) -> Vec<String> {
        self.state
            .log()
            .served
            .iter()
            .map(|&index| self.state.entries[index].interaction.description.clone())
            .collect()
    }

    /// Requests that matched no interaction, in arrival order.
    #[must_use]
    pub fn mismatches(&self) -> Vec<UnmatchedRequest> {
        self.state.log().mismatches.clone()
    }

    /// Check that every request matched and every interaction was exercised.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::RequestMismatch`], [`PactError::AmbiguousInteraction`]
    /// or [`PactError::MissingRequest`], in that order of precedence.
    pub fn verify(&self) -> PactResult<()> {
        let log = self.state.log();
        if !log.mismatches.is_empty() {
            return Err(PactError::RequestMismatch {
                requests: log.mismatches.clone(),
            });
        }
        if let Some((first, second)) = log.ambiguities.first() {
            return Err(PactError::AmbiguousInteraction {
                first: first.clone(),
                second: second.clone(),
            });
        }
        for (index, entry) in self.state.entries.iter().enumerate() {
            if !log.served.contains(&index) {
                return Err(PactError::MissingRequest {
                    description: entry.interaction.description.clone(),
                });
            }
        }
        Ok(())
    }

    /// Stop the listener and wait for it to shut down.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(addr = %self.addr, "mock provider stopped");
    }
}

impl Drop for MockServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[instrument(skip(state, headers), fields(method = %method, path = %uri.path()))]
async fn handle_request(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let _exchange = state.exchange.lock().await;

    let actual_headers = flatten_headers(&headers);
    let path = uri.path();
    let matched: Vec<usize> = state
        .entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| {
            entry
                .expected
                .diff(method.as_str(), path, &actual_headers)
                .is_empty()
        })
        .map(|(index, _)| index)
        .collect();

    match matched.as_slice() {
        [index] => {
            let entry = &state.entries[*index];
            debug!(interaction = %entry.interaction.description, "request matched");
            state.log().served.push(*index);
            serve(entry)
        }
        [] => {
            let unmatched = UnmatchedRequest {
                method: method.to_string(),
                path: path.to_string(),
                diffs: closest_diffs(&state.entries, method.as_str(), path, &actual_headers),
            };
            warn!(request = %unmatched, "unexpected request");
            let body = json!({
                "error": "Unexpected request",
                "method": unmatched.method,
                "path": unmatched.path,
                "diffs": unmatched.diffs,
            });
            state.log().mismatches.push(unmatched);
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
        [first, second, ..] => {
            let first = state.entries[*first].interaction.description.clone();
            let second = state.entries[*second].interaction.description.clone();
            warn!(%first, %second, "request matched several interactions");
            let body = json!({
                "error": "Ambiguous request",
                "interactions": [first, second],
            });
            state.log().ambiguities.push((first, second));
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
        }
    }
}

fn serve(entry: &Entry) -> Response {
    let body = entry
        .body
        .as_ref()
        .map_or_else(Body::empty, |body| Body::from(body.to_string()));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(entry.interaction.response.status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in &entry.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

fn closest_diffs(
    entries: &[Entry],
    method: &str,
    path: &str,
    headers: &BTreeMap<String, String>,
) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.expected.diff(method, path, headers))
        .min_by_key(Vec::len)
        .unwrap_or_else(|| vec!["no interactions declared".to_string()])
}
