//! Input sources and the input merger.
//!
//! A request carries up to three independent inputs: path parameters, the
//! query string and the JSON body. Each is validated against its own schema
//! and the results are folded into one flat object with
//! `params < query < body` precedence.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ContractError, ValidationError};
use crate::schema::{Schema, ValidateOptions};

/// One of the three places request input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    /// Named path segments.
    Params,
    /// The URL query string.
    Query,
    /// The JSON request body.
    Body,
}

impl InputSource {
    /// All sources in merge order. Later sources win.
    pub const ALL: [Self; 3] = [Self::Params, Self::Query, Self::Body];

    /// Returns the source name used in error paths.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source input schemas of a contract.
///
/// ```
/// use pactum_core::{InputSchemas, Schema};
///
/// let input = InputSchemas::new()
///     .params(Schema::object([("id", Schema::integer())]))
///     .query(Schema::object([("page", Schema::integer().default(1))]));
/// assert!(input.body_schema().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchemas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    params: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Schema>,
}

impl InputSchemas {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the path parameter schema.
    pub fn params(mut self, schema: Schema) -> Self {
        self.params = Some(schema);
        self
    }

    /// Declares the query schema.
    pub fn query(mut self, schema: Schema) -> Self {
        self.query = Some(schema);
        self
    }

    /// Declares the body schema.
    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }

    /// Returns the schema declared for `source`.
    #[must_use]
    pub fn get(&self, source: InputSource) -> Option<&Schema> {
        match source {
            InputSource::Params => self.params.as_ref(),
            InputSource::Query => self.query.as_ref(),
            InputSource::Body => self.body.as_ref(),
        }
    }

    /// Returns the path parameter schema.
    #[must_use]
    pub fn params_schema(&self) -> Option<&Schema> {
        self.params.as_ref()
    }

    /// Returns the query schema.
    #[must_use]
    pub fn query_schema(&self) -> Option<&Schema> {
        self.query.as_ref()
    }

    /// Returns the body schema.
    #[must_use]
    pub fn body_schema(&self) -> Option<&Schema> {
        self.body.as_ref()
    }

    /// Returns `true` if no source is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_none() && self.query.is_none() && self.body.is_none()
    }

    /// Checks that every declared source is object-shaped.
    pub(crate) fn check_shapes(&self) -> Result<(), ContractError> {
        for source in InputSource::ALL {
            if let Some(schema) = self.get(source) {
                if !schema.is_object() {
                    return Err(ContractError::InvalidInputSchema {
                        input_source: source,
                        found: schema.kind_name(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Raw, unvalidated input for one request or call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInput {
    /// Path parameters.
    pub params: Map<String, Value>,
    /// Query parameters. Repeated keys are arrays.
    pub query: Map<String, Value>,
    /// Request body. `Null` means no body.
    pub body: Value,
}

impl RawInput {
    /// Creates empty input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets path parameters.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Sets query parameters.
    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    fn source_value(&self, source: InputSource) -> Value {
        match source {
            InputSource::Params => Value::Object(self.params.clone()),
            InputSource::Query => Value::Object(self.query.clone()),
            InputSource::Body if self.body.is_null() => Value::Object(Map::new()),
            InputSource::Body => self.body.clone(),
        }
    }
}

/// The three validated source objects, kept apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedInput {
    /// Validated path parameters.
    pub params: Map<String, Value>,
    /// Validated query parameters.
    pub query: Map<String, Value>,
    /// Validated body fields.
    pub body: Map<String, Value>,
}

impl ValidatedInput {
    /// Folds the sources into a single object. Body keys override query
    /// keys, which override params keys.
    #[must_use]
    pub fn merge(self) -> Value {
        let mut merged = self.params;
        merged.extend(self.query);
        merged.extend(self.body);
        Value::Object(merged)
    }
}

/// Validates each declared source with coercion enabled.
///
/// Sources are checked in `params`, `query`, `body` order and the first one
/// that fails short-circuits. Its errors are nested under the source name,
/// so a bad id is reported at `params.id`. Undeclared sources contribute
/// an empty object.
pub fn validate_sources(
    schemas: &InputSchemas,
    raw: &RawInput,
) -> Result<ValidatedInput, ValidationError> {
    let mut validated = ValidatedInput::default();

    for source in InputSource::ALL {
        let Some(schema) = schemas.get(source) else {
            continue;
        };
        let value = schema
            .validate(&raw.source_value(source), ValidateOptions::coercing())
            .map_err(|errors| ValidationError::input(errors.prefixed(source.as_str())))?;

        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        match source {
            InputSource::Params => validated.params = fields,
            InputSource::Query => validated.query = fields,
            InputSource::Body => validated.body = fields,
        }
    }

    Ok(validated)
}

/// Validates every source and merges them into one flat object.
pub fn merge_input(schemas: &InputSchemas, raw: &RawInput) -> Result<Value, ValidationError> {
    validate_sources(schemas, raw).map(ValidatedInput::merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Phase;
    use proptest::prelude::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_undeclared_sources_contribute_nothing() {
        let raw = RawInput::new()
            .with_params(obj(json!({"id": "1"})))
            .with_query(obj(json!({"page": "2"})))
            .with_body(json!({"name": "x"}));

        assert_eq!(merge_input(&InputSchemas::new(), &raw).unwrap(), json!({}));
    }

    #[test]
    fn test_defaults_apply_to_omitted_source() {
        let schemas = InputSchemas::new()
            .query(Schema::object([("page", Schema::integer().default(1))]));

        let merged = merge_input(&schemas, &RawInput::new()).unwrap();
        assert_eq!(merged, json!({"page": 1}));
    }

    #[test]
    fn test_params_are_coerced() {
        let schemas = InputSchemas::new().params(Schema::object([("id", Schema::integer())]));
        let raw = RawInput::new().with_params(obj(json!({"id": "123"})));

        assert_eq!(merge_input(&schemas, &raw).unwrap(), json!({"id": 123}));
    }

    #[test]
    fn test_body_wins_on_overlap() {
        let schemas = InputSchemas::new()
            .params(Schema::object([("x", Schema::string())]))
            .query(Schema::object([("x", Schema::string())]))
            .body(Schema::object([("x", Schema::string())]));
        let raw = RawInput::new()
            .with_params(obj(json!({"x": "params"})))
            .with_query(obj(json!({"x": "query"})))
            .with_body(json!({"x": "body"}));

        assert_eq!(merge_input(&schemas, &raw).unwrap(), json!({"x": "body"}));
    }

    #[test]
    fn test_query_wins_over_params() {
        let schemas = InputSchemas::new()
            .params(Schema::object([("x", Schema::string())]))
            .query(Schema::object([("x", Schema::string())]));
        let raw = RawInput::new()
            .with_params(obj(json!({"x": "params"})))
            .with_query(obj(json!({"x": "query"})));

        assert_eq!(merge_input(&schemas, &raw).unwrap(), json!({"x": "query"}));
    }

    #[test]
    fn test_errors_are_prefixed_with_source() {
        let schemas = InputSchemas::new().params(Schema::object([("id", Schema::integer())]));
        let raw = RawInput::new().with_params(obj(json!({"id": "abc"})));

        let err = merge_input(&schemas, &raw).unwrap_err();
        assert_eq!(err.phase, Phase::Input);
        assert_eq!(err.errors.len(), 1);
        assert!(!err.errors.messages_at("params.id").is_empty());
        assert!(err.to_tree()["params"]["id"].is_array());
    }

    #[test]
    fn test_first_failing_source_short_circuits() {
        let schemas = InputSchemas::new()
            .params(Schema::object([("id", Schema::integer())]))
            .body(Schema::object([("name", Schema::string())]));
        let raw = RawInput::new().with_params(obj(json!({"id": "abc"})));

        let err = merge_input(&schemas, &raw).unwrap_err();
        assert!(err.errors.iter().all(|e| e.path_string().starts_with("params.")));
    }

    #[test]
    fn test_null_body_counts_as_empty_object() {
        let schemas = InputSchemas::new().body(Schema::object([(
            "tags",
            Schema::array(Schema::string()).optional(),
        )]));

        assert_eq!(merge_input(&schemas, &RawInput::new()).unwrap(), json!({}));
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        let schemas = InputSchemas::new().body(Schema::object([("name", Schema::string())]));
        let raw = RawInput::new().with_body(json!([1, 2]));

        let err = merge_input(&schemas, &raw).unwrap_err();
        assert!(!err.errors.messages_at("body").is_empty());
    }

    #[test]
    fn test_check_shapes_names_source() {
        let schemas = InputSchemas::new().query(Schema::array(Schema::string()));
        assert_eq!(
            schemas.check_shapes(),
            Err(ContractError::InvalidInputSchema {
                input_source: InputSource::Query,
                found: "array",
            })
        );
    }

    proptest! {
        #[test]
        fn prop_body_precedence(
            p in "[a-z]{1,8}",
            q in "[a-z]{1,8}",
            b in "[a-z]{1,8}",
        ) {
            let field = || Schema::object([("v", Schema::string())]);
            let schemas = InputSchemas::new().params(field()).query(field()).body(field());
            let raw = RawInput::new()
                .with_params(obj(json!({"v": p})))
                .with_query(obj(json!({"v": q})))
                .with_body(json!({"v": b.clone()}));

            let merged = merge_input(&schemas, &raw).unwrap();
            prop_assert_eq!(merged, json!({"v": b}));
        }

        #[test]
        fn prop_disjoint_sources_are_all_kept(
            p in 0i64..1000,
            q in 0i64..1000,
        ) {
            let schemas = InputSchemas::new()
                .params(Schema::object([("a", Schema::integer())]))
                .query(Schema::object([("b", Schema::integer())]));
            let raw = RawInput::new()
                .with_params(obj(json!({"a": p.to_string()})))
                .with_query(obj(json!({"b": q})));

            let merged = merge_input(&schemas, &raw).unwrap();
            prop_assert_eq!(merged, json!({"a": p, "b": q}));
        }
    }
}
