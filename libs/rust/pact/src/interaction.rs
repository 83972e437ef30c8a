//! Interaction specifications.
//!
//! An interaction pairs a provider state with a request matcher and a response
//! matcher. It is built and validated once, when the test defines it, and is
//! immutable afterwards.

use crate::error::{PactError, PactResult};
use crate::state::{ProviderState, StateBindings, StateExpression};
use crate::template::{Generator, Template};
use serde_json::Value;
use std::collections::BTreeMap;

/// Content type served for every response carrying a body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Request path: a literal or a provider-state expression with an example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    /// Exact path
    Literal(String),
    /// Path computed from provider state, e.g. `/api/task/${task-id}`
    FromProviderState {
        /// Parsed expression
        expression: StateExpression,
        /// Path used when the state parameters are not bound on the consumer side
        example: String,
    },
}

impl PathSpec {
    /// Concrete path for the given bindings.
    #[must_use]
    pub fn resolve(&self, bindings: &StateBindings) -> String {
        match self {
            Self::Literal(path) => path.clone(),
            Self::FromProviderState {
                expression,
                example,
            } => expression
                .resolve(bindings)
                .unwrap_or_else(|| example.clone()),
        }
    }

    /// Generator recorded for the provider, if the path is state-derived.
    #[must_use]
    pub fn generator(&self) -> Option<Generator> {
        match self {
            Self::Literal(_) => None,
            Self::FromProviderState {
                expression,
                example,
            } => Some(Generator::provider_state(
                expression,
                &Value::String(example.clone()),
            )),
        }
    }
}

/// Expected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatcher {
    /// HTTP method, upper case after validation
    pub method: String,
    /// Request path
    pub path: PathSpec,
    /// Required headers; names compare case-insensitively
    pub headers: BTreeMap<String, String>,
}

impl RequestMatcher {
    /// Request with a literal path.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: PathSpec::Literal(path.into()),
            headers: BTreeMap::new(),
        }
    }

    /// `GET` request with a literal path.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Request whose path comes from provider state.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::InvalidDefinition`] if `expression` does not parse.
    pub fn from_provider_state(
        method: impl Into<String>,
        expression: &str,
        example: impl Into<String>,
    ) -> PactResult<Self> {
        Ok(Self {
            method: method.into(),
            path: PathSpec::FromProviderState {
                expression: StateExpression::parse(expression)?,
                example: example.into(),
            },
            headers: BTreeMap::new(),
        })
    }

    /// Require a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Concrete request the mock provider expects for the given bindings.
    #[must_use]
    pub fn resolve(&self, bindings: &StateBindings) -> ExpectedRequest {
        ExpectedRequest {
            method: self.method.clone(),
            path: self.path.resolve(bindings),
            headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
                .collect(),
        }
    }
}

/// A request matcher with state expressions resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedRequest {
    /// HTTP method
    pub method: String,
    /// Concrete path
    pub path: String,
    /// Required headers with lower-case names
    pub headers: BTreeMap<String, String>,
}

impl ExpectedRequest {
    /// Differences between this expectation and an actual request.
    ///
    /// `headers` must use lower-case names. An empty result means the request matches.
    #[must_use]
    pub fn diff(
        &self,
        method: &str,
        path: &str,
        headers: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let mut diffs = Vec::new();
        if !self.method.eq_ignore_ascii_case(method) {
            diffs.push(format!("method: expected {}, got {method}", self.method));
        }
        if self.path != path {
            diffs.push(format!("path: expected '{}', got '{path}'", self.path));
        }
        for (name, expected) in &self.headers {
            match headers.get(name) {
                Some(actual) if actual == expected => {}
                Some(actual) => diffs.push(format!(
                    "header {name}: expected '{expected}', got '{actual}'"
                )),
                None => diffs.push(format!("header {name}: expected '{expected}', was missing")),
            }
        }
        diffs
    }

    /// Whether some request could satisfy both expectations.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.method.eq_ignore_ascii_case(&other.method)
            && self.path == other.path
            && self.headers.iter().all(|(name, value)| {
                other
                    .headers
                    .get(name)
                    .is_none_or(|other_value| other_value == value)
            })
    }
}

/// Expected response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMatcher {
    /// HTTP status
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Body template
    pub body: Option<Template>,
}

impl ResponseMatcher {
    /// Response with the given status and no body.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Add a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body template.
    #[must_use]
    pub fn body(mut self, body: Template) -> Self {
        self.body = Some(body);
        self
    }

    /// Declared headers plus `Content-Type: application/json` when a body is present.
    #[must_use]
    pub fn effective_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        let has_content_type = headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        if self.body.is_some() && !has_content_type {
            headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        }
        headers
    }
}

/// Identity of an interaction within a contract.
///
/// Two interactions with the same description and state name but different
/// parameter bindings are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionKey {
    /// Consumer name
    pub consumer: String,
    /// Provider name
    pub provider: String,
    /// Interaction description
    pub description: String,
    /// Provider state name
    pub state: String,
    /// Consumer-bound state parameters
    pub params: BTreeMap<String, String>,
}

/// A validated interaction specification.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Consumer name
    pub consumer: String,
    /// Provider name
    pub provider: String,
    /// Human-readable description, unique per provider state
    pub description: String,
    /// Provider precondition
    pub provider_state: ProviderState,
    /// Expected request
    pub request: RequestMatcher,
    /// Response served by the mock
    pub response: ResponseMatcher,
}

impl Interaction {
    /// Start defining an interaction between `consumer` and `provider`.
    #[must_use]
    pub fn builder(consumer: impl Into<String>, provider: impl Into<String>) -> InteractionBuilder {
        InteractionBuilder::new(consumer, provider)
    }

    /// Identity used for deduplication in contracts.
    #[must_use]
    pub fn key(&self) -> InteractionKey {
        InteractionKey {
            consumer: self.consumer.clone(),
            provider: self.provider.clone(),
            description: self.description.clone(),
            state: self.provider_state.name.clone(),
            params: self.provider_state.params.clone(),
        }
    }

    /// Request expected by the mock provider.
    #[must_use]
    pub fn expected_request(&self) -> ExpectedRequest {
        self.request.resolve(&self.provider_state.bindings())
    }

    /// Body the mock provider serves, if any.
    #[must_use]
    pub fn generated_body(&self) -> Option<Value> {
        self.response
            .body
            .as_ref()
            .map(|body| body.generate(&self.provider_state.bindings()))
    }
}

/// Builder for [`Interaction`].
#[derive(Debug, Clone)]
pub struct InteractionBuilder {
    consumer: String,
    provider: String,
    description: String,
    provider_state: ProviderState,
    request: Option<RequestMatcher>,
    response: Option<ResponseMatcher>,
}

impl InteractionBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            provider: provider.into(),
            description: String::new(),
            provider_state: ProviderState::default(),
            request: None,
            response: None,
        }
    }

    /// Set the provider state.
    #[must_use]
    pub fn given(mut self, state: impl Into<ProviderState>) -> Self {
        self.provider_state = state.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn upon_receiving(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expected request.
    #[must_use]
    pub fn with_request(mut self, request: RequestMatcher) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the response.
    #[must_use]
    pub fn will_respond_with(mut self, response: ResponseMatcher) -> Self {
        self.response = Some(response);
        self
    }

    /// Validate and build the interaction.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::InvalidDefinition`] for a missing or malformed part
    /// and [`PactError::UnresolvedStateParameter`] for a state expression
    /// referencing an undeclared parameter.
    pub fn build(self) -> PactResult<Interaction> {
        if self.consumer.trim().is_empty() || self.provider.trim().is_empty() {
            return Err(PactError::invalid_definition("consumer and provider names are required"));
        }
        if self.description.trim().is_empty() {
            return Err(PactError::invalid_definition("interaction description is required"));
        }

        let mut request = self
            .request
            .ok_or_else(|| PactError::invalid_definition("request is required"))?;
        let response = self
            .response
            .ok_or_else(|| PactError::invalid_definition("response is required"))?;

        if request.method.is_empty() || !request.method.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PactError::invalid_definition(format!(
                "invalid HTTP method '{}'",
                request.method
            )));
        }
        request.method = request.method.to_ascii_uppercase();

        match &request.path {
            PathSpec::Literal(path) => check_path(path)?,
            PathSpec::FromProviderState {
                expression,
                example,
            } => {
                expression.check_declared(&self.provider_state)?;
                check_path(example)?;
            }
        }

        for name in request.headers.keys().chain(response.headers.keys()) {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_graphic() && c != ':') {
                return Err(PactError::invalid_definition(format!(
                    "invalid header name '{name}'"
                )));
            }
        }

        if !(100..=599).contains(&response.status) {
            return Err(PactError::invalid_definition(format!(
                "invalid response status {}",
                response.status
            )));
        }
        if let Some(body) = &response.body {
            body.validate(&self.provider_state)?;
        }

        Ok(Interaction {
            consumer: self.consumer,
            provider: self.provider,
            description: self.description,
            provider_state: self.provider_state,
            request,
            response,
        })
    }
}

impl From<&str> for ProviderState {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ProviderState {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

fn check_path(path: &str) -> PactResult<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(PactError::invalid_definition(format!(
            "request path '{path}' must start with '/'"
        )))
    }
}
