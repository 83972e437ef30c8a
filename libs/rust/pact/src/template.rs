//! Template nodes describing expected and generated values.
//!
//! One template serves three purposes:
//! - synthesis: the mock provider generates a concrete body from it,
//! - matching: a returned value is checked against it structurally,
//! - metadata: the contract stores its matching rules and generators so a
//!   rule-aware reader can verify the provider without the literal examples.

use crate::error::{PactError, PactResult};
use crate::state::{ProviderState, StateBindings, StateExpression};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Primitive JSON kinds a typed placeholder can constrain a value to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Any JSON string
    String,
    /// Any JSON number
    Number,
    /// Any JSON integer
    Integer,
    /// `true` or `false`
    Boolean,
}

impl PrimitiveKind {
    /// Example used when the author does not supply one.
    #[must_use]
    pub fn default_example(self) -> Value {
        match self {
            Self::String => Value::from("string"),
            Self::Number => Value::from(100.0),
            Self::Integer => Value::from(100),
            Self::Boolean => Value::Bool(true),
        }
    }

    /// Whether `value` is of this kind.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }

    /// Kind of a primitive value, `None` for null, arrays and objects.
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(Self::String),
            Value::Number(n) if n.is_f64() => Some(Self::Number),
            Value::Number(_) => Some(Self::Integer),
            Value::Bool(_) => Some(Self::Boolean),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    const fn matcher(self) -> &'static str {
        match self {
            Self::String | Self::Boolean => "type",
            Self::Number => "number",
            Self::Integer => "integer",
        }
    }

    const fn data_type(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "DECIMAL",
            Self::Integer => "INTEGER",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Expected value description.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// Exact expected value
    Literal(Value),
    /// Any value of `kind`; `example` is served by the mock
    Typed {
        /// Required kind
        kind: PrimitiveKind,
        /// Example value served by the mock
        example: Value,
    },
    /// Value taken from a provider-state parameter, falling back to `example`
    StateDerived {
        /// Parsed `${name}` expression
        expression: StateExpression,
        /// Example used when the parameter is not bound on the consumer side
        example: Value,
    },
    /// Array of at least `min` elements shaped like `element`
    ArrayMinLike {
        /// Minimum element count, also the number of generated elements
        min: usize,
        /// Element template
        element: Box<Template>,
    },
    /// Object with ordered fields
    Object(Vec<(String, Template)>),
}

/// A structural mismatch between a template and an actual value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyMismatch {
    /// JSON path of the offending value
    pub path: String,
    /// What was wrong
    pub reason: String,
}

impl fmt::Display for BodyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Single matcher inside a rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    /// Matcher name (`type`, `integer`, `number`)
    #[serde(rename = "match")]
    pub kind: String,
    /// Minimum array length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
}

/// Matchers applying to one JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleList {
    /// How matchers combine
    pub combine: String,
    /// Matchers
    pub matchers: Vec<Matcher>,
}

impl RuleList {
    fn single(kind: &str, min: Option<usize>) -> Self {
        Self {
            combine: "AND".to_string(),
            matchers: vec![Matcher {
                kind: kind.to_string(),
                min,
            }],
        }
    }
}

/// Provider-side value generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    /// Generator type, always `ProviderState` here
    #[serde(rename = "type")]
    pub kind: String,
    /// State expression to evaluate on the provider
    pub expression: String,
    /// Target data type
    #[serde(rename = "dataType")]
    pub data_type: String,
}

impl Generator {
    /// Generator evaluating `expression` against provider state, producing `example`'s kind.
    #[must_use]
    pub fn provider_state(expression: &StateExpression, example: &Value) -> Self {
        Self {
            kind: "ProviderState".to_string(),
            expression: expression.as_str().to_string(),
            data_type: PrimitiveKind::of(example)
                .unwrap_or(PrimitiveKind::String)
                .data_type()
                .to_string(),
        }
    }
}

/// Matching rules keyed by JSON path.
pub type MatchingRules = BTreeMap<String, RuleList>;

/// Generators keyed by JSON path.
pub type Generators = BTreeMap<String, Generator>;

impl Template {
    /// Exact value.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Any value of `kind`, served with the kind's default example.
    #[must_use]
    pub fn of_kind(kind: PrimitiveKind) -> Self {
        Self::Typed {
            kind,
            example: kind.default_example(),
        }
    }

    /// Any string, served as `example`.
    #[must_use]
    pub fn string_type(example: impl Into<String>) -> Self {
        Self::Typed {
            kind: PrimitiveKind::String,
            example: Value::String(example.into()),
        }
    }

    /// Any integer, served as `example`.
    #[must_use]
    pub fn integer_type(example: i64) -> Self {
        Self::Typed {
            kind: PrimitiveKind::Integer,
            example: Value::from(example),
        }
    }

    /// Any number, served as `example`.
    #[must_use]
    pub fn number_type(example: f64) -> Self {
        Self::Typed {
            kind: PrimitiveKind::Number,
            example: Value::from(example),
        }
    }

    /// Any boolean, served as `example`.
    #[must_use]
    pub const fn boolean_type(example: bool) -> Self {
        Self::Typed {
            kind: PrimitiveKind::Boolean,
            example: Value::Bool(example),
        }
    }

    /// Value derived from provider state.
    ///
    /// # Errors
    ///
    /// Returns [`PactError::InvalidDefinition`] if `expression` does not parse.
    pub fn from_provider_state(expression: &str, example: impl Into<Value>) -> PactResult<Self> {
        Ok(Self::StateDerived {
            expression: StateExpression::parse(expression)?,
            example: example.into(),
        })
    }

    /// Array with at least `min` elements like `element`.
    #[must_use]
    pub fn array_min_like(min: usize, element: Self) -> Self {
        Self::ArrayMinLike {
            min,
            element: Box::new(element),
        }
    }

    /// Start building an object template.
    #[must_use]
    pub fn object() -> ObjectTemplate {
        ObjectTemplate::default()
    }

    /// Check the definition-time invariants against the owning provider state.
    ///
    /// # Errors
    ///
    /// Fails on an undeclared state parameter, an `ArrayMinLike` with
    /// `min == 0`, a typed example of the wrong kind, or a duplicate object field.
    pub fn validate(&self, state: &ProviderState) -> PactResult<()> {
        self.validate_at("$", state)
    }

    /// Every provider-state parameter referenced by `StateDerived` nodes.
    #[must_use]
    pub fn state_references(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Self::Literal(_) | Self::Typed { .. } => {}
            Self::StateDerived { expression, .. } => names.extend(expression.parameters()),
            Self::ArrayMinLike { element, .. } => element.collect_references(names),
            Self::Object(fields) => {
                for (_, field) in fields {
                    field.collect_references(names);
                }
            }
        }
    }

    fn validate_at(&self, path: &str, state: &ProviderState) -> PactResult<()> {
        match self {
            Self::Literal(_) => Ok(()),
            Self::Typed { kind, example } => {
                if kind.accepts(example) {
                    Ok(())
                } else {
                    Err(PactError::invalid_definition(format!(
                        "{path}: example {example} is not a {kind}"
                    )))
                }
            }
            Self::StateDerived {
                expression,
                example,
            } => {
                expression.check_declared(state)?;
                let Some(kind) = PrimitiveKind::of(example) else {
                    return Ok(());
                };
                match expression.resolve(&state.bindings()) {
                    Some(resolved) if !kind.accepts(&coerce(resolved.clone(), example)) => {
                        Err(PactError::invalid_definition(format!(
                            "{path}: bound value '{resolved}' for {expression} is not a {kind}"
                        )))
                    }
                    _ => Ok(()),
                }
            }
            Self::ArrayMinLike { min, element } => {
                if *min == 0 {
                    return Err(PactError::invalid_definition(format!(
                        "{path}: minimum array length must be at least 1"
                    )));
                }
                element.validate_at(&element_path(path), state)
            }
            Self::Object(fields) => {
                for (i, (name, field)) in fields.iter().enumerate() {
                    if fields[..i].iter().any(|(other, _)| other == name) {
                        return Err(PactError::invalid_definition(format!(
                            "{path}: duplicate field '{name}'"
                        )));
                    }
                    field.validate_at(&field_path(path, name), state)?;
                }
                Ok(())
            }
        }
    }

    /// Synthesize a concrete value.
    #[must_use]
    pub fn generate(&self, bindings: &StateBindings) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Typed { example, .. } => example.clone(),
            Self::StateDerived {
                expression,
                example,
            } => expression
                .resolve(bindings)
                .map_or_else(|| example.clone(), |resolved| coerce(resolved, example)),
            Self::ArrayMinLike { min, element } => {
                Value::Array((0..*min).map(|_| element.generate(bindings)).collect())
            }
            Self::Object(fields) => {
                let map: Map<String, Value> = fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.generate(bindings)))
                    .collect();
                Value::Object(map)
            }
        }
    }

    /// Structural/type-level match of `actual` against this template.
    ///
    /// Extra fields in actual objects are accepted.
    #[must_use]
    pub fn match_value(&self, actual: &Value) -> Vec<BodyMismatch> {
        let mut mismatches = Vec::new();
        self.match_at("$", actual, &mut mismatches);
        mismatches
    }

    fn match_at(&self, path: &str, actual: &Value, out: &mut Vec<BodyMismatch>) {
        let mismatch = |out: &mut Vec<BodyMismatch>, reason: String| {
            out.push(BodyMismatch {
                path: path.to_string(),
                reason,
            });
        };

        match self {
            Self::Literal(expected) => {
                if expected != actual {
                    mismatch(out, format!("expected {expected}, got {actual}"));
                }
            }
            Self::Typed { kind, .. } => {
                if !kind.accepts(actual) {
                    mismatch(out, format!("expected a {kind}, got {actual}"));
                }
            }
            Self::StateDerived { example, .. } => match PrimitiveKind::of(example) {
                Some(kind) if !kind.accepts(actual) => {
                    mismatch(out, format!("expected a {kind}, got {actual}"));
                }
                Some(_) => {}
                None => {
                    if example != actual {
                        mismatch(out, format!("expected {example}, got {actual}"));
                    }
                }
            },
            Self::ArrayMinLike { min, element } => match actual {
                Value::Array(items) => {
                    if items.len() < *min {
                        let found = items.len();
                        mismatch(
                            out,
                            format!("expected at least {min} element(s), got {found}"),
                        );
                    }
                    for (i, item) in items.iter().enumerate() {
                        element.match_at(&format!("{path}[{i}]"), item, out);
                    }
                }
                other => mismatch(out, format!("expected an array, got {other}")),
            },
            Self::Object(fields) => match actual {
                Value::Object(map) => {
                    for (name, field) in fields {
                        let child = field_path(path, name);
                        match map.get(name) {
                            Some(value) => field.match_at(&child, value, out),
                            None => out.push(BodyMismatch {
                                path: child,
                                reason: "missing field".to_string(),
                            }),
                        }
                    }
                }
                other => mismatch(out, format!("expected an object, got {other}")),
            },
        }
    }

    /// Matching rules for the contract, keyed by JSON path.
    #[must_use]
    pub fn matching_rules(&self) -> MatchingRules {
        let mut rules = MatchingRules::new();
        self.collect_rules("$", &mut rules);
        rules
    }

    fn collect_rules(&self, path: &str, rules: &mut MatchingRules) {
        match self {
            Self::Literal(_) => {}
            Self::Typed { kind, .. } => {
                rules.insert(path.to_string(), RuleList::single(kind.matcher(), None));
            }
            Self::StateDerived { .. } => {
                rules.insert(path.to_string(), RuleList::single("type", None));
            }
            Self::ArrayMinLike { min, element } => {
                rules.insert(path.to_string(), RuleList::single("type", Some(*min)));
                element.collect_rules(&element_path(path), rules);
            }
            Self::Object(fields) => {
                for (name, field) in fields {
                    field.collect_rules(&field_path(path, name), rules);
                }
            }
        }
    }

    /// Provider-state generators for the contract, keyed by JSON path.
    #[must_use]
    pub fn generators(&self) -> Generators {
        let mut generators = Generators::new();
        self.collect_generators("$", &mut generators);
        generators
    }

    fn collect_generators(&self, path: &str, generators: &mut Generators) {
        match self {
            Self::Literal(_) | Self::Typed { .. } => {}
            Self::StateDerived {
                expression,
                example,
            } => {
                generators.insert(
                    path.to_string(),
                    Generator::provider_state(expression, example),
                );
            }
            Self::ArrayMinLike { element, .. } => {
                element.collect_generators(&element_path(path), generators);
            }
            Self::Object(fields) => {
                for (name, field) in fields {
                    field.collect_generators(&field_path(path, name), generators);
                }
            }
        }
    }
}

/// Field-by-field comparison of `actual` against a generated example.
///
/// Every field present in `expected` must be present and equal in `actual`;
/// arrays must have the same length. Extra fields in `actual` are ignored.
#[must_use]
pub fn example_mismatches(expected: &Value, actual: &Value) -> Vec<BodyMismatch> {
    let mut out = Vec::new();
    compare_example("$", expected, actual, &mut out);
    out
}

fn compare_example(path: &str, expected: &Value, actual: &Value, out: &mut Vec<BodyMismatch>) {
    match (expected, actual) {
        (Value::Object(want), Value::Object(got)) => {
            for (name, value) in want {
                let child = field_path(path, name);
                match got.get(name) {
                    Some(found) => compare_example(&child, value, found, out),
                    None => out.push(BodyMismatch {
                        path: child,
                        reason: "missing field".to_string(),
                    }),
                }
            }
        }
        (Value::Array(want), Value::Array(got)) => {
            if want.len() == got.len() {
                for (i, (w, g)) in want.iter().zip(got).enumerate() {
                    compare_example(&format!("{path}[{i}]"), w, g, out);
                }
            } else {
                out.push(BodyMismatch {
                    path: path.to_string(),
                    reason: format!("expected {} element(s), got {}", want.len(), got.len()),
                });
            }
        }
        _ if expected == actual => {}
        _ => out.push(BodyMismatch {
            path: path.to_string(),
            reason: format!("expected {expected}, got {actual}"),
        }),
    }
}

/// Builder for [`Template::Object`].
///
/// Expression parse errors are kept until [`ObjectTemplate::build`] so
/// field declarations chain.
#[derive(Debug, Default)]
pub struct ObjectTemplate {
    fields: Vec<(String, Template)>,
    error: Option<PactError>,
}

impl ObjectTemplate {
    /// Add a field with an arbitrary template.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, template: Template) -> Self {
        self.fields.push((name.into(), template));
        self
    }

    /// Add a field with an exact string value.
    #[must_use]
    pub fn string_value(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(name, Template::Literal(Value::String(value.into())))
    }

    /// Add a field matching any string.
    #[must_use]
    pub fn string_type(self, name: impl Into<String>, example: impl Into<String>) -> Self {
        self.field(name, Template::string_type(example))
    }

    /// Add a field matching any integer.
    #[must_use]
    pub fn integer_type(self, name: impl Into<String>, example: i64) -> Self {
        self.field(name, Template::integer_type(example))
    }

    /// Add a field matching any boolean.
    #[must_use]
    pub fn boolean_type(self, name: impl Into<String>, example: bool) -> Self {
        self.field(name, Template::boolean_type(example))
    }

    /// Add a field whose value comes from provider state.
    #[must_use]
    pub fn value_from_provider_state(
        mut self,
        name: impl Into<String>,
        expression: &str,
        example: impl Into<Value>,
    ) -> Self {
        match Template::from_provider_state(expression, example) {
            Ok(template) => self.field(name, template),
            Err(e) => {
                self.error.get_or_insert(e);
                self
            }
        }
    }

    /// Finish the object.
    ///
    /// # Errors
    ///
    /// Returns the first expression parse error recorded while building.
    pub fn build(self) -> PactResult<Template> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(Template::Object(self.fields)),
        }
    }
}

fn field_path(parent: &str, name: &str) -> String {
    let simple = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if simple {
        format!("{parent}.{name}")
    } else {
        format!("{parent}['{name}']")
    }
}

fn element_path(parent: &str) -> String {
    format!("{parent}[*]")
}

fn coerce(resolved: String, example: &Value) -> Value {
    match example {
        Value::Number(_) => resolved
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| resolved.parse::<f64>().map(Value::from))
            .unwrap_or(Value::String(resolved)),
        Value::Bool(_) => resolved
            .parse::<bool>()
            .map_or(Value::String(resolved), Value::Bool),
        _ => Value::String(resolved),
    }
}
