//! Declarative value shapes and the validation engine behind them.
//!
//! A [`Schema`] is a closed variant type: scalars (`string`, `integer`,
//! `number`, `boolean`, `any`), `array` of an item schema, and `object` of
//! named field schemas. Every schema carries three modifiers: whether it is
//! required inside its parent object, whether `null` is accepted, and an
//! optional default applied when the field is missing.
//!
//! Validation returns the *validated* value rather than a yes/no answer:
//! unknown object keys are stripped, defaults are filled in, and, when
//! [`ValidateOptions::coerce`] is set, strings coming from path segments or
//! query strings are converted into the declared scalar types.
//!
//! # Example
//!
//! ```
//! use pactum_core::schema::{Schema, ValidateOptions};
//! use serde_json::json;
//!
//! let schema = Schema::object([
//!     ("id", Schema::integer()),
//!     ("page", Schema::integer().default(1)),
//!     ("tag", Schema::string().optional()),
//! ]);
//!
//! let value = schema
//!     .validate(&json!({"id": "42", "extra": true}), ValidateOptions::coercing())
//!     .unwrap();
//!
//! assert_eq!(value, json!({"id": 42, "page": 1}));
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Key under which errors about a node itself are stored in an error tree.
pub const TREE_SELF_KEY: &str = "_errors";

/// Options controlling a single validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Convert compatible values into the declared type (e.g. `"2"` → `2`).
    pub coerce: bool,
}

impl ValidateOptions {
    /// Validation without any type conversion.
    #[must_use]
    pub const fn strict() -> Self {
        Self { coerce: false }
    }

    /// Validation that coerces strings and numbers into the declared type.
    #[must_use]
    pub const fn coercing() -> Self {
        Self { coerce: true }
    }
}

/// The shape of a value, independent of its modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaKind {
    /// UTF-8 string.
    String {
        /// Minimum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        /// Maximum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        /// Closed set of accepted values.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        one_of: Option<Vec<String>>,
    },
    /// Signed 64-bit integer.
    Integer {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    /// Any JSON number.
    Number {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    /// `true` or `false`.
    Boolean,
    /// Homogeneous list.
    Array {
        /// Schema every item must satisfy.
        items: Box<Schema>,
        /// Minimum number of items.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        /// Maximum number of items.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    /// Map of named fields. Keys not declared here are dropped.
    Object {
        /// Field schemas, in declaration order.
        properties: IndexMap<String, Schema>,
    },
    /// Accepts any value unchanged, including `null`.
    Any,
}

/// A declarative description of an expected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(flatten)]
    kind: SchemaKind,
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default)]
    nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl From<SchemaKind> for Schema {
    fn from(kind: SchemaKind) -> Self {
        Self {
            kind,
            required: true,
            nullable: false,
            default: None,
        }
    }
}

impl Schema {
    /// Creates a string schema.
    #[must_use]
    pub fn string() -> Self {
        SchemaKind::String {
            min_length: None,
            max_length: None,
            one_of: None,
        }
        .into()
    }

    /// Creates an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        SchemaKind::Integer {
            minimum: None,
            maximum: None,
        }
        .into()
    }

    /// Creates a number schema.
    #[must_use]
    pub fn number() -> Self {
        SchemaKind::Number {
            minimum: None,
            maximum: None,
        }
        .into()
    }

    /// Creates a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        SchemaKind::Boolean.into()
    }

    /// Creates a schema that accepts anything.
    #[must_use]
    pub fn any() -> Self {
        SchemaKind::Any.into()
    }

    /// Creates an array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
        .into()
    }

    /// Creates an object schema from `(name, schema)` pairs.
    ///
    /// A later pair with the same name replaces the earlier one, so field
    /// names are always unique.
    #[must_use]
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        SchemaKind::Object {
            properties: fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
        }
        .into()
    }

    /// Marks the field as optional: it may be missing from its parent object.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Marks the field as required (the default).
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accepts `null` in addition to the declared type.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value inserted when the field is missing from its parent object.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the minimum length for string schemas.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let SchemaKind::String { min_length, .. } = &mut self.kind {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum length for string schemas.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let SchemaKind::String { max_length, .. } = &mut self.kind {
            *max_length = Some(len);
        }
        self
    }

    /// Restricts a string schema to a closed set of values.
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let SchemaKind::String { one_of, .. } = &mut self.kind {
            *one_of = Some(values.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Sets the minimum value for integer schemas.
    #[must_use]
    pub fn minimum_int(mut self, min: i64) -> Self {
        if let SchemaKind::Integer { minimum, .. } = &mut self.kind {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the maximum value for integer schemas.
    #[must_use]
    pub fn maximum_int(mut self, max: i64) -> Self {
        if let SchemaKind::Integer { maximum, .. } = &mut self.kind {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the minimum value for number schemas.
    #[must_use]
    pub fn minimum_number(mut self, min: f64) -> Self {
        if let SchemaKind::Number { minimum, .. } = &mut self.kind {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the maximum value for number schemas.
    #[must_use]
    pub fn maximum_number(mut self, max: f64) -> Self {
        if let SchemaKind::Number { maximum, .. } = &mut self.kind {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the minimum number of items for array schemas.
    #[must_use]
    pub fn min_items(mut self, min: usize) -> Self {
        if let SchemaKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(min);
        }
        self
    }

    /// Sets the maximum number of items for array schemas.
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        if let SchemaKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(max);
        }
        self
    }

    /// Returns the shape of this schema.
    #[must_use]
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Returns the lowercase name of this schema's shape.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            SchemaKind::String { .. } => "string",
            SchemaKind::Integer { .. } => "integer",
            SchemaKind::Number { .. } => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object { .. } => "object",
            SchemaKind::Any => "any",
        }
    }

    /// Returns `true` for object schemas.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object { .. })
    }

    /// Returns the field schemas of an object schema.
    #[must_use]
    pub fn properties(&self) -> Option<&IndexMap<String, Schema>> {
        match &self.kind {
            SchemaKind::Object { properties } => Some(properties),
            _ => None,
        }
    }

    /// Returns whether the field must be present in its parent object.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether `null` is accepted.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Validates `value` against this schema.
    ///
    /// Returns the validated value (unknown keys stripped, defaults applied,
    /// coercions performed), or every field error found.
    ///
    /// # Example
    ///
    /// ```
    /// use pactum_core::schema::{Schema, ValidateOptions};
    /// use serde_json::json;
    ///
    /// let schema = Schema::integer().minimum_int(1);
    /// assert!(schema.validate(&json!("3"), ValidateOptions::strict()).is_err());
    /// assert_eq!(
    ///     schema.validate(&json!("3"), ValidateOptions::coercing()).unwrap(),
    ///     json!(3)
    /// );
    /// ```
    pub fn validate(&self, value: &Value, options: ValidateOptions) -> Result<Value, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut path = Vec::new();
        let validated = self.validate_at(value, options, &mut path, &mut errors);

        match validated {
            Some(value) if errors.is_empty() => Ok(value),
            _ => Err(errors),
        }
    }

    fn validate_at(
        &self,
        value: &Value,
        options: ValidateOptions,
        path: &mut Vec<PathSegment>,
        errors: &mut FieldErrors,
    ) -> Option<Value> {
        if value.is_null() {
            if self.nullable || matches!(self.kind, SchemaKind::Any) {
                return Some(Value::Null);
            }
            errors.push(path.clone(), format!("expected {}, got null", self.kind_name()));
            return None;
        }

        match &self.kind {
            SchemaKind::String {
                min_length,
                max_length,
                one_of,
            } => {
                let s = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) if options.coerce => n.to_string(),
                    Value::Bool(b) if options.coerce => b.to_string(),
                    other => {
                        errors.push(path.clone(), type_mismatch("string", other));
                        return None;
                    }
                };

                let len = s.chars().count();
                if let Some(min) = min_length {
                    if len < *min {
                        errors.push(
                            path.clone(),
                            format!("string length {len} is less than minimum {min}"),
                        );
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        errors.push(
                            path.clone(),
                            format!("string length {len} is greater than maximum {max}"),
                        );
                    }
                }
                if let Some(allowed) = one_of {
                    if !allowed.iter().any(|a| *a == s) {
                        errors.push(
                            path.clone(),
                            format!("invalid enum value: expected one of {}", allowed.join(", ")),
                        );
                    }
                }

                Some(Value::String(s))
            }

            SchemaKind::Integer { minimum, maximum } => {
                let Some(n) = as_integer(value, options) else {
                    errors.push(path.clone(), type_mismatch("integer", value));
                    return None;
                };

                if let Some(min) = minimum {
                    if n < *min {
                        errors.push(path.clone(), format!("value {n} is less than minimum {min}"));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        errors.push(
                            path.clone(),
                            format!("value {n} is greater than maximum {max}"),
                        );
                    }
                }

                Some(Value::Number(n.into()))
            }

            SchemaKind::Number { minimum, maximum } => {
                let Some(n) = as_number(value, options) else {
                    errors.push(path.clone(), type_mismatch("number", value));
                    return None;
                };

                let f = n.as_f64().unwrap_or_default();
                if let Some(min) = minimum {
                    if f < *min {
                        errors.push(path.clone(), format!("value {f} is less than minimum {min}"));
                    }
                }
                if let Some(max) = maximum {
                    if f > *max {
                        errors.push(
                            path.clone(),
                            format!("value {f} is greater than maximum {max}"),
                        );
                    }
                }

                Some(Value::Number(n))
            }

            SchemaKind::Boolean => {
                let parsed = match value {
                    Value::Bool(b) => Some(*b),
                    Value::String(s) if options.coerce => parse_bool(s),
                    _ => None,
                };
                if parsed.is_none() {
                    errors.push(path.clone(), type_mismatch("boolean", value));
                }
                parsed.map(Value::Bool)
            }

            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let wrapped;
                let list = match value {
                    Value::Array(list) => list,
                    Value::Object(_) => {
                        errors.push(path.clone(), type_mismatch("array", value));
                        return None;
                    }
                    scalar if options.coerce => {
                        wrapped = vec![scalar.clone()];
                        &wrapped
                    }
                    other => {
                        errors.push(path.clone(), type_mismatch("array", other));
                        return None;
                    }
                };

                if let Some(min) = min_items {
                    if list.len() < *min {
                        errors.push(
                            path.clone(),
                            format!("array length {} is less than minimum {}", list.len(), min),
                        );
                    }
                }
                if let Some(max) = max_items {
                    if list.len() > *max {
                        errors.push(
                            path.clone(),
                            format!("array length {} is greater than maximum {}", list.len(), max),
                        );
                    }
                }

                let mut out = Vec::with_capacity(list.len());
                for (idx, item) in list.iter().enumerate() {
                    path.push(PathSegment::Index(idx));
                    if let Some(v) = items.validate_at(item, options, path, errors) {
                        out.push(v);
                    }
                    path.pop();
                }

                Some(Value::Array(out))
            }

            SchemaKind::Object { properties } => {
                let Value::Object(obj) = value else {
                    errors.push(path.clone(), type_mismatch("object", value));
                    return None;
                };

                let mut out = Map::new();
                for (name, field) in properties {
                    path.push(PathSegment::Key(name.clone()));
                    match obj.get(name) {
                        Some(raw) => {
                            if let Some(v) = field.validate_at(raw, options, path, errors) {
                                out.insert(name.clone(), v);
                            }
                        }
                        None => {
                            if let Some(default) = &field.default {
                                out.insert(name.clone(), default.clone());
                            } else if field.required {
                                errors.push(path.clone(), "is required");
                            }
                        }
                    }
                    path.pop();
                }

                Some(Value::Object(out))
            }

            SchemaKind::Any => Some(value.clone()),
        }
    }
}

fn as_integer(value: &Value, options: ValidateOptions) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| if options.coerce { integral(n.as_f64()?) } else { None }),
        Value::String(s) if options.coerce => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| integral(trimmed.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn as_number(value: &Value, options: ValidateOptions) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) if options.coerce => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Some(i.into());
            }
            trimmed.parse::<f64>().ok().and_then(Number::from_f64)
        }
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        t if t.eq_ignore_ascii_case("true") || t == "1" => Some(true),
        t if t.eq_ignore_ascii_case("false") || t == "0" => Some(false),
        _ => None,
    }
}

fn type_mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {}", value_type_name(value))
}

/// Returns a human-readable name for a JSON value type.
#[must_use]
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step in the path to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        Self::Index(idx)
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path from the validated root to the failing value. Empty for the root.
    pub path: Vec<PathSegment>,
    /// Human-readable description.
    pub message: String,
}

impl FieldError {
    /// Renders the path as `user.tags[2]`, or `$` for the root.
    #[must_use]
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "$".to_string();
        }
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(idx) => {
                    out.push('[');
                    out.push_str(&idx.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path_string(), self.message)
    }
}

/// Every error found while validating one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl std::error::Error for FieldErrors {}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join("; "))
    }
}

impl FieldErrors {
    /// Creates an empty error list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list holding a single error.
    #[must_use]
    pub fn single(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(path, message);
        errors
    }

    /// Records an error at `path`.
    pub fn push(&mut self, path: Vec<PathSegment>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path,
            message: message.into(),
        });
    }

    /// Returns `true` if no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterates over the errors in the order they were found.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Returns the messages recorded for a rendered path such as `params.id`.
    #[must_use]
    pub fn messages_at(&self, path: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.path_string() == path)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Nests every error path under `segment`.
    #[must_use]
    pub fn prefixed(mut self, segment: impl Into<PathSegment>) -> Self {
        let segment = segment.into();
        for error in &mut self.errors {
            error.path.insert(0, segment.clone());
        }
        self
    }

    /// Renders the errors as a nested JSON object keyed by path segment.
    ///
    /// Leaves are arrays of messages. Messages about a node that also has
    /// child errors, and messages about the root itself, are stored under
    /// [`TREE_SELF_KEY`].
    ///
    /// ```
    /// use pactum_core::schema::FieldErrors;
    /// use serde_json::json;
    ///
    /// let mut errors = FieldErrors::new();
    /// errors.push(vec!["user".into(), "name".into()], "is required");
    /// assert_eq!(errors.to_tree(), json!({"user": {"name": ["is required"]}}));
    /// ```
    #[must_use]
    pub fn to_tree(&self) -> Value {
        let mut root = Map::new();
        for error in &self.errors {
            insert_into_tree(&mut root, &error.path, &error.message);
        }
        Value::Object(root)
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

fn push_self_message(node: &mut Map<String, Value>, message: &str) {
    match node
        .entry(TREE_SELF_KEY)
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(list) => list.push(Value::String(message.to_string())),
        other => *other = Value::Array(vec![Value::String(message.to_string())]),
    }
}

fn insert_into_tree(node: &mut Map<String, Value>, path: &[PathSegment], message: &str) {
    let Some((first, rest)) = path.split_first() else {
        push_self_message(node, message);
        return;
    };

    let entry = node.entry(first.to_string()).or_insert(Value::Null);

    if rest.is_empty() {
        match entry {
            Value::Object(child) => push_self_message(child, message),
            Value::Array(list) => list.push(Value::String(message.to_string())),
            other => *other = Value::Array(vec![Value::String(message.to_string())]),
        }
        return;
    }

    // A leaf that now needs children keeps its messages under the self key.
    if !entry.is_object() {
        let mut child = Map::new();
        if let Value::Array(messages) = entry.take() {
            child.insert(TREE_SELF_KEY.to_string(), Value::Array(messages));
        }
        *entry = Value::Object(child);
    }
    if let Value::Object(child) = entry {
        insert_into_tree(child, rest, message);
    }
}
