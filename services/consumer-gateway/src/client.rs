//! Gateway clients for the provider REST APIs.
//!
//! One generic client serves every resource: `GET {base}/{id}` for a single
//! item and `GET {base}` for the collection, both authenticated with the
//! bearer token from the configured [`TokenProvider`]. Calls are single
//! attempts; nothing is retried or cached.

use crate::config::ConfigError;
use crate::domain::{Resource, Task, User};
use crate::error::{GatewayError, GatewayResult};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use rust_common::TokenProvider;
use rust_common::http::APPLICATION_JSON;
use secrecy::ExposeSecret;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Client for one provider resource.
pub struct ResourceClient<R: Resource> {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    _resource: PhantomData<fn() -> R>,
}

/// Client for the task provider.
pub type TaskClient = ResourceClient<Task>;

/// Client for the user provider.
pub type UserClient = ResourceClient<User>;

impl<R: Resource> ResourceClient<R> {
    /// Create a client for the resource collection at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if `base_url` is not an absolute
    /// URL that can carry a path.
    pub fn new(
        http: Client,
        base_url: &str,
        tokens: Arc<dyn TokenProvider>,
    ) -> GatewayResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidUrl {
            field: format!("{} API URL", R::NAME),
            reason: e.to_string(),
        })?;
        match base_url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty();
            }
            Err(()) => {
                return Err(ConfigError::InvalidUrl {
                    field: format!("{} API URL", R::NAME),
                    reason: "URL cannot carry a path".to_string(),
                }
                .into());
            }
        }

        Ok(Self {
            http,
            base_url,
            tokens,
            _resource: PhantomData,
        })
    }

    /// Collection URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one item by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InsufficientAuthentication`] on 403,
    /// [`GatewayError::UnmappedTransportFailure`] on any other non-2xx status
    /// and [`GatewayError::Deserialization`] for an undecodable body.
    #[instrument(skip(self), fields(resource = R::NAME))]
    pub async fn fetch_by_id(&self, id: &str) -> GatewayResult<R> {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }

        let body = self.get(url).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch the whole collection.
    ///
    /// An absent or empty body, `204 No Content` and JSON `null` all yield an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_by_id`].
    #[instrument(skip(self), fields(resource = R::NAME))]
    pub async fn fetch_all(&self) -> GatewayResult<Vec<R>> {
        let response = self.get(self.base_url.clone()).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!("empty collection body");
            return Ok(Vec::new());
        }
        let items: Option<Vec<R>> = serde_json::from_slice(&body)?;
        Ok(items.unwrap_or_default())
    }

    async fn get(&self, url: Url) -> GatewayResult<reqwest::Response> {
        let token = self.tokens.bearer_token()?;
        let response = self
            .http
            .get(url)
            .header(ACCEPT, APPLICATION_JSON)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "provider responded");
        if status == StatusCode::FORBIDDEN {
            return Err(GatewayError::InsufficientAuthentication { resource: R::NAME });
        }
        if !status.is_success() {
            return Err(GatewayError::UnmappedTransportFailure {
                status: status.as_u16(),
                resource: R::NAME,
            });
        }
        Ok(response)
    }
}

impl<R: Resource> std::fmt::Debug for ResourceClient<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("resource", &R::NAME)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
