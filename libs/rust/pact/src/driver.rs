//! Type-state consumer test driver.
//!
//! A consumer test moves through a fixed sequence of states:
//!
//! ```text
//! ConsumerTest<Defined> -> ConsumerTest<MockStarted> -> Exchange<T> -> Verified<T>
//! ```
//!
//! Only a [`Verified`] value can be recorded, so a failed exchange or a failed
//! assertion can never leave an interaction in the contract.

use crate::error::{PactError, PactResult};
use crate::interaction::Interaction;
use crate::mock_server::{MockServer, MockServerConfig, MockServerHandle};
use crate::recorder::ContractRecorder;
use crate::template::example_mismatches;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

mod private {
    /// Sealed trait to prevent external implementations
    pub trait Sealed {}
}

/// Marker trait for consumer test states
pub trait TestState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Interactions defined, no listener yet
pub struct Defined;
impl private::Sealed for Defined {}
impl TestState for Defined {
    fn state_name() -> &'static str {
        "Defined"
    }
}

/// Mock provider listening
pub struct MockStarted {
    handle: MockServerHandle,
}
impl private::Sealed for MockStarted {}
impl TestState for MockStarted {
    fn state_name() -> &'static str {
        "MockStarted"
    }
}

/// A consumer contract test in state `S`.
pub struct ConsumerTest<S: TestState> {
    interactions: Vec<Interaction>,
    config: MockServerConfig,
    state: S,
}

impl ConsumerTest<Defined> {
    /// Test exercising a single interaction.
    #[must_use]
    pub fn new(interaction: Interaction) -> Self {
        Self::with_interactions(vec![interaction])
    }

    /// Test exercising several interactions against one mock provider.
    #[must_use]
    pub fn with_interactions(interactions: Vec<Interaction>) -> Self {
        Self {
            interactions,
            config: MockServerConfig::default(),
            state: Defined,
        }
    }

    /// Override the mock provider settings.
    #[must_use]
    pub fn with_config(mut self, config: MockServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the mock provider.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::InvalidDefinition`] when no interaction is defined,
    /// [`PactError::AmbiguousInteraction`] for overlapping interactions and
    /// [`PactError::Bind`] if the listener cannot be bound.
    pub async fn start_mock(self) -> PactResult<ConsumerTest<MockStarted>> {
        if self.interactions.is_empty() {
            return Err(PactError::invalid_definition("no interactions defined"));
        }
        let handle = MockServer::start(self.interactions.clone(), &self.config).await?;
        debug!(
            state = MockStarted::state_name(),
            url = %handle.url(),
            "consumer test advanced"
        );
        Ok(ConsumerTest {
            interactions: self.interactions,
            config: self.config,
            state: MockStarted { handle },
        })
    }
}

impl ConsumerTest<MockStarted> {
    /// Base URL of the running mock provider.
    #[must_use]
    pub fn mock_url(&self) -> String {
        self.state.handle.url()
    }

    /// Run the client under test against the mock provider.
    ///
    /// `client` receives the mock base URL. Once it completes the mock is
    /// stopped and verified.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Timeout`] if `client` exceeds the configured
    /// request timeout, otherwise whatever [`MockServerHandle::verify`] reports.
    pub async fn exercise<F, Fut, T>(self, client: F) -> PactResult<Exchange<T>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = T>,
    {
        let duration = self.config.request_timeout;
        let handle = self.state.handle;

        let outcome = tokio::time::timeout(duration, client(handle.url())).await;
        let verification = handle.verify();
        handle.stop().await;

        let value = outcome.map_err(|_| {
            warn!(?duration, "client did not complete in time");
            PactError::Timeout { duration }
        })?;
        if let Err(error) = verification {
            warn!(%error, "mock provider verification failed");
            return Err(error);
        }

        Ok(Exchange {
            interactions: self.interactions,
            value,
        })
    }
}

impl<S: TestState> fmt::Debug for ConsumerTest<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerTest")
            .field("state", &S::state_name())
            .field("interactions", &self.interactions.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Outcome of a completed exchange, awaiting assertions.
#[derive(Debug)]
pub struct Exchange<T> {
    interactions: Vec<Interaction>,
    value: T,
}

impl<T> Exchange<T> {
    /// Value the client under test returned.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Accept the exchange if `predicate` holds for the returned value.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::AssertionFailed`] naming `what` otherwise.
    pub fn assert_that(
        self,
        what: &str,
        predicate: impl FnOnce(&T) -> bool,
    ) -> PactResult<Verified<T>> {
        if predicate(&self.value) {
            Ok(Verified {
                interactions: self.interactions,
                value: self.value,
            })
        } else {
            Err(PactError::assertion(what))
        }
    }
}

impl<T: Serialize, E: fmt::Display> Exchange<Result<T, E>> {
    /// Accept the exchange if the client returned a value matching the response body.
    ///
    /// The value is serialized and compared with the interaction's body
    /// template, both structurally and field-by-field against the example.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::AssertionFailed`] if the client returned an error
    /// or no single interaction declares a body, and
    /// [`PactError::BodyMismatch`] if the value does not conform.
    pub fn assert_body_matches(self) -> PactResult<Verified<T>> {
        let value = self
            .value
            .map_err(|error| PactError::assertion(format!("client returned an error: {error}")))?;

        let mut with_body = self.interactions.iter().filter(|i| i.response.body.is_some());
        let (Some(interaction), None) = (with_body.next(), with_body.next()) else {
            return Err(PactError::assertion(
                "body assertion needs exactly one interaction with a response body",
            ));
        };
        let (Some(template), Some(example)) =
            (interaction.response.body.as_ref(), interaction.generated_body())
        else {
            return Err(PactError::Internal("response body disappeared".to_string()));
        };

        let actual = serde_json::to_value(&value)?;
        let mismatches: Vec<String> = template
            .match_value(&actual)
            .into_iter()
            .chain(example_mismatches(&example, &actual))
            .map(|mismatch| mismatch.to_string())
            .collect();
        if !mismatches.is_empty() {
            return Err(PactError::BodyMismatch { mismatches });
        }

        Ok(Verified {
            interactions: self.interactions,
            value,
        })
    }
}

/// An exchange whose outcome passed its assertions.
#[derive(Debug)]
pub struct Verified<T> {
    interactions: Vec<Interaction>,
    value: T,
}

impl<T> Verified<T> {
    /// Record the verified interactions and hand back the client's value.
    pub fn record(self, recorder: &mut ContractRecorder) -> T {
        for interaction in &self.interactions {
            if recorder.record(interaction) {
                info!(
                    provider = %interaction.provider,
                    description = %interaction.description,
                    "interaction verified"
                );
            }
        }
        self.value
    }

    /// Value the client under test returned.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }
}
