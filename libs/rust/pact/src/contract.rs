//! Pact contract document.
//!
//! Request and response values are literal examples; matching rules and
//! generators carry the rule-aware metadata a provider verifier needs.

use crate::error::{PactError, PactResult};
use crate::interaction::Interaction;
use crate::state::ProviderState;
use crate::template::{Generator, Generators, MatchingRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Pact specification version written to every contract.
pub const PACT_SPECIFICATION_VERSION: &str = "4.0";

/// A Pact contract between consumer and provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contract {
    /// Consumer participant
    pub consumer: Participant,
    /// Provider participant
    pub provider: Participant,
    /// Contract interactions
    pub interactions: Vec<RecordedInteraction>,
    /// Contract metadata
    pub metadata: ContractMetadata,
}

impl Contract {
    /// Empty contract for a consumer/provider pair.
    #[must_use]
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: Participant::new(consumer),
            provider: Participant::new(provider),
            interactions: Vec::new(),
            metadata: ContractMetadata::default(),
        }
    }

    /// File name used when persisting: `{consumer}-{provider}.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}.json", self.consumer.name, self.provider.name)
    }

    /// Whether an interaction with the same identity is already present.
    #[must_use]
    pub fn contains(&self, interaction: &RecordedInteraction) -> bool {
        self.interactions
            .iter()
            .any(|existing| existing.same_identity(interaction))
    }

    /// Append an interaction unless one with the same identity exists.
    ///
    /// Returns `true` if the interaction was added.
    pub fn add(&mut self, interaction: RecordedInteraction) -> bool {
        if self.contains(&interaction) {
            return false;
        }
        self.interactions.push(interaction);
        true
    }

    /// Order interactions by identity so the file is independent of the
    /// order in which interactions were recorded.
    pub fn sort_by_identity(&mut self) {
        self.interactions
            .sort_by(|left, right| left.identity().cmp(&right.identity()));
    }

    /// Pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Serialization`] if serialization fails.
    pub fn to_json_pretty(&self) -> PactResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse a contract from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::Serialization`] for malformed JSON.
    pub fn from_json(json: &str) -> PactResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a contract file.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::ContractFile`] if the file cannot be read and
    /// [`PactError::Serialization`] if it is not a valid contract.
    pub fn load(path: &Path) -> PactResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| PactError::ContractFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// A participant in a contract (consumer or provider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// Participant name
    pub name: String,
}

impl Participant {
    /// Create a new participant.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An interaction as written to the contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedInteraction {
    /// Interaction description
    pub description: String,
    /// Provider state (precondition)
    pub provider_state: ProviderState,
    /// Expected request
    pub request: Request,
    /// Expected response
    pub response: Response,
}

impl RecordedInteraction {
    /// Description, provider state name and parameter bindings.
    #[must_use]
    pub fn identity(&self) -> (&str, &str, &BTreeMap<String, String>) {
        (
            &self.description,
            &self.provider_state.name,
            &self.provider_state.params,
        )
    }

    /// Same description, provider state name and parameter bindings.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl From<&Interaction> for RecordedInteraction {
    fn from(interaction: &Interaction) -> Self {
        let expected = interaction.expected_request();
        let request = Request {
            method: expected.method,
            path: expected.path,
            headers: interaction.request.headers.clone(),
            generators: interaction
                .request
                .path
                .generator()
                .map(|path| RequestGenerators { path: Some(path) }),
        };

        let body_template = interaction.response.body.as_ref();
        let matching_rules = body_template
            .map(crate::template::Template::matching_rules)
            .filter(|rules| !rules.is_empty())
            .map(|body| BodyRules { body });
        let generators = body_template
            .map(crate::template::Template::generators)
            .filter(|generators| !generators.is_empty())
            .map(|body| BodyGenerators { body });

        let response = Response {
            status: interaction.response.status,
            headers: interaction.response.effective_headers(),
            body: interaction.generated_body(),
            matching_rules,
            generators,
        };

        Self {
            description: interaction.description.clone(),
            provider_state: interaction.provider_state.clone(),
            request,
            response,
        }
    }
}

/// HTTP request in an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    /// HTTP method
    pub method: String,
    /// Example request path
    pub path: String,
    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Provider-side request generators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generators: Option<RequestGenerators>,
}

/// Request generators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestGenerators {
    /// Generator for the path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Generator>,
}

/// HTTP response in an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Example response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Body matching rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_rules: Option<BodyRules>,
    /// Body generators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generators: Option<BodyGenerators>,
}

/// Matching rules for the response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BodyRules {
    /// Rules keyed by JSON path
    pub body: MatchingRules,
}

/// Generators for the response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BodyGenerators {
    /// Generators keyed by JSON path
    pub body: Generators,
}

/// Contract metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractMetadata {
    /// Pact specification version
    #[serde(rename = "pactSpecification")]
    pub pact_specification: PactSpecification,
}

/// Pact specification version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PactSpecification {
    /// Version string
    pub version: String,
}

impl Default for ContractMetadata {
    fn default() -> Self {
        Self {
            pact_specification: PactSpecification {
                version: PACT_SPECIFICATION_VERSION.to_string(),
            },
        }
    }
}
