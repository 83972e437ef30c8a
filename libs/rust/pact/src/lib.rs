//! Consumer-driven contract testing.
//!
//! Consumer tests declare [`Interaction`]s, run their real client against a
//! local mock provider and, once the exchange is verified, record the
//! interactions into Pact contract files for later provider verification.
//!
//! ```no_run
//! use cdct_pact::{
//!     ConsumerTest, ContractRecorder, Interaction, MockServerConfig, RequestMatcher,
//!     ResponseMatcher, Template,
//! };
//!
//! # async fn run() -> cdct_pact::PactResult<()> {
//! let interaction = Interaction::builder("consumer", "provider")
//!     .given("A task with task id '1' is present")
//!     .upon_receiving("A request for task 1")
//!     .with_request(RequestMatcher::get("/api/task/1"))
//!     .will_respond_with(
//!         ResponseMatcher::status(200).body(Template::object().string_value("id", "1").build()?),
//!     )
//!     .build()?;
//!
//! let mut recorder = ContractRecorder::new();
//! ConsumerTest::new(interaction)
//!     .with_config(MockServerConfig::ephemeral())
//!     .start_mock()
//!     .await?
//!     .exercise(|url| async move { reqwest::get(format!("{url}/api/task/1")).await })
//!     .await?
//!     .assert_that("status is 200", |r| r.as_ref().is_ok_and(|r| r.status() == 200))?
//!     .record(&mut recorder);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod driver;
pub mod error;
pub mod interaction;
pub mod mock_server;
pub mod recorder;
pub mod state;
pub mod template;

pub use contract::{
    Contract, ContractMetadata, PACT_SPECIFICATION_VERSION, PactSpecification, Participant,
    RecordedInteraction, Request, Response,
};
pub use driver::{ConsumerTest, Defined, Exchange, MockStarted, TestState, Verified};
pub use error::{PactError, PactResult};
pub use interaction::{
    ExpectedRequest, Interaction, InteractionBuilder, InteractionKey, PathSpec, RequestMatcher,
    ResponseMatcher,
};
pub use mock_server::{MockServer, MockServerConfig, MockServerHandle, UnmatchedRequest};
pub use recorder::{ContractRecorder, WriteMode};
pub use state::{ProviderState, StateBindings, StateExpression};
pub use template::{BodyMismatch, Generator, ObjectTemplate, PrimitiveKind, Template};
