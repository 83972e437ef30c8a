//! Provider states and the `${name}` state expression language.
//!
//! A provider state is a named precondition the provider must satisfy before an
//! interaction can take place. It may carry parameters in two flavours:
//!
//! - consumer-bound parameters, whose values become part of the contract and
//!   are handed to the provider's state set-up, and
//! - provider-supplied parameters, whose values the provider generates (e.g. a
//!   database sequence id). The consumer only knows an example value.
//!
//! Paths and body values can reference either kind through state expressions
//! such as `/api/task/${task-id}`. Expressions are parsed once, when the
//! interaction is defined, and resolved against the bindings when the mock
//! provider serves the interaction.

use crate::error::{PactError, PactResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Parameter bindings available while serving an interaction.
pub type StateBindings = BTreeMap<String, String>;

/// A named provider precondition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderState {
    /// State name as understood by the provider's state handlers
    pub name: String,
    /// Consumer-bound parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// Parameters the provider supplies during verification
    #[serde(skip)]
    pub provider_params: BTreeSet<String>,
}

impl ProviderState {
    /// Create a provider state without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
            provider_params: BTreeSet::new(),
        }
    }

    /// Bind a consumer-supplied parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Declare a parameter whose value the provider generates.
    #[must_use]
    pub fn with_provider_param(mut self, name: impl Into<String>) -> Self {
        self.provider_params.insert(name.into());
        self
    }

    /// Whether `name` is declared by this state, bound or provider-supplied.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.params.contains_key(name) || self.provider_params.contains(name)
    }

    /// Bindings used when serving the interaction from the mock provider.
    ///
    /// Only consumer-bound parameters have values on the consumer side;
    /// provider-supplied ones fall back to their example values.
    #[must_use]
    pub fn bindings(&self) -> StateBindings {
        self.params.clone()
    }
}

impl Default for ProviderState {
    fn default() -> Self {
        Self::new("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Text(String),
    Param(String),
}

/// A parsed state expression: literal text interleaved with `${name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateExpression {
    source: String,
    segments: Vec<Segment>,
}

impl StateExpression {
    /// Parse an expression.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::InvalidDefinition`] for an unclosed `${`, an empty
    /// parameter name, or a `$`/`{` inside a parameter name.
    ///
    /// # Examples
    ///
    /// ```
    /// use cdct_pact::StateExpression;
    ///
    /// let expr = StateExpression::parse("/api/task/${task-id}").unwrap();
    /// assert_eq!(expr.parameters().collect::<Vec<_>>(), vec!["task-id"]);
    /// ```
    pub fn parse(source: &str) -> PactResult<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("${") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| {
                PactError::invalid_definition(format!("unclosed '${{' in expression '{source}'"))
            })?;
            let name = &after[..end];
            if name.is_empty() {
                return Err(PactError::invalid_definition(format!(
                    "empty parameter name in expression '{source}'"
                )));
            }
            if name.contains(['$', '{']) {
                return Err(PactError::invalid_definition(format!(
                    "invalid parameter name '{name}' in expression '{source}'"
                )));
            }
            segments.push(Segment::Param(name.to_string()));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of all referenced parameters, in order of appearance.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Substitute every placeholder, or `None` if any parameter is unbound.
    #[must_use]
    pub fn resolve(&self, bindings: &StateBindings) -> Option<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param(name) => out.push_str(bindings.get(name)?),
            }
        }
        Some(out)
    }

    /// Fail unless every referenced parameter is declared by `state`.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::UnresolvedStateParameter`] naming the first
    /// undeclared parameter.
    pub fn check_declared(&self, state: &ProviderState) -> PactResult<()> {
        match self.parameters().find(|name| !state.declares(name)) {
            Some(name) => Err(PactError::UnresolvedStateParameter {
                parameter: name.to_string(),
                state: state.name.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for StateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
