//! Route path templates.
//!
//! A template is a `/`-separated path whose segments are either literals or
//! named parameters written as `:name`, e.g. `/users/:id/posts/:post_id`.
//! The same template is used by the server to match incoming paths and by
//! the client to render outgoing URLs.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ContractError;
use crate::schema::{FieldErrors, PathSegment};

/// One segment of a [`PathTemplate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Matches exactly this text.
    Literal(String),
    /// Captures one path segment under this name.
    Param(String),
}

/// A parsed route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a route path.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::EmptyPath`] for an empty string and
    /// [`ContractError::InvalidPath`] if the path does not start with `/`,
    /// has an unnamed parameter, or repeats a parameter name.
    pub fn parse(path: &str) -> Result<Self, ContractError> {
        if path.is_empty() {
            return Err(ContractError::EmptyPath);
        }
        if !path.starts_with('/') {
            return Err(invalid(path, "must start with '/'"));
        }

        let mut segments = Vec::new();
        for part in path.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid(path, "parameter segment has no name"));
                }
                if segments
                    .iter()
                    .any(|s| matches!(s, Segment::Param(n) if n == name))
                {
                    return Err(invalid(path, &format!("duplicate parameter ':{name}'")));
                }
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self {
            raw: "/".to_string(),
            segments: Vec::new(),
        }
    }

    /// Returns the path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over the parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns `true` if the template has no parameters.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.param_names().next().is_none()
    }

    /// Matches a concrete request path, returning captured parameters as
    /// JSON strings. Captured values are percent-decoded.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Map<String, Value>> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = Map::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let decoded = urlencoding::decode(part)
                        .map_or_else(|_| part.to_string(), |d| d.into_owned());
                    params.insert(name.clone(), Value::String(decoded));
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Substitutes parameter values into the template.
    ///
    /// Strings are inserted as-is and numbers and booleans by their JSON
    /// text, all percent-encoded. A trailing `/` in the template is kept.
    ///
    /// # Errors
    ///
    /// Returns one field error at `params.<name>` for every parameter that
    /// is missing, null, or not a scalar.
    pub fn render(&self, params: &Map<String, Value>) -> Result<String, FieldErrors> {
        let mut out = String::with_capacity(self.raw.len());
        let mut errors = FieldErrors::new();

        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Param(name) => {
                    let text = match params.get(name) {
                        Some(Value::String(s)) => s.clone(),
                        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
                        None | Some(Value::Null) => {
                            errors.push(param_path(name), "is required");
                            continue;
                        }
                        Some(other) => {
                            errors.push(
                                param_path(name),
                                format!(
                                    "expected string, got {}",
                                    crate::schema::value_type_name(other)
                                ),
                            );
                            continue;
                        }
                    };
                    out.push_str(&urlencoding::encode(&text));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        if out.is_empty() || (self.raw.len() > 1 && self.raw.ends_with('/')) {
            out.push('/');
        }
        Ok(out)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid(path: &str, reason: &str) -> ContractError {
    ContractError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn param_path(name: &str) -> Vec<PathSegment> {
    vec![PathSegment::from("params"), PathSegment::from(name)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_segments() {
        let t = PathTemplate::parse("/users/:id/posts/:post_id").unwrap();
        assert_eq!(t.param_names().collect::<Vec<_>>(), vec!["id", "post_id"]);
        assert_eq!(t.segments().len(), 4);
        assert!(!t.is_static());
        assert!(PathTemplate::parse("/health").unwrap().is_static());
    }

    #[test]
    fn test_parse_rejects_bad_paths() {
        assert_eq!(PathTemplate::parse(""), Err(ContractError::EmptyPath));
        assert!(matches!(
            PathTemplate::parse("users"),
            Err(ContractError::InvalidPath { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/users/:"),
            Err(ContractError::InvalidPath { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/a/:id/b/:id"),
            Err(ContractError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_matches_captures_params() {
        let t = PathTemplate::parse("/users/:id").unwrap();

        let params = t.matches("/users/42").unwrap();
        assert_eq!(params.get("id"), Some(&json!("42")));

        assert!(t.matches("/users").is_none());
        assert!(t.matches("/users/42/extra").is_none());
        assert!(t.matches("/accounts/42").is_none());
    }

    #[test]
    fn test_matches_decodes_params() {
        let t = PathTemplate::parse("/files/:name").unwrap();
        let params = t.matches("/files/hello%20world").unwrap();
        assert_eq!(params.get("name"), Some(&json!("hello world")));
    }

    #[test]
    fn test_matches_ignores_trailing_slash() {
        let t = PathTemplate::parse("/users/:id").unwrap();
        assert!(t.matches("/users/7/").is_some());
    }

    #[test]
    fn test_render_substitutes_params() {
        let t = PathTemplate::parse("/users/:id/posts/:slug").unwrap();
        let rendered = t
            .render(&map(json!({"id": 42, "slug": "a b"})))
            .unwrap();
        assert_eq!(rendered, "/users/42/posts/a%20b");
    }

    #[test]
    fn test_render_root() {
        let t = PathTemplate::parse("/").unwrap();
        assert_eq!(t.render(&Map::new()).unwrap(), "/");
    }

    #[test]
    fn test_render_keeps_trailing_slash() {
        let t = PathTemplate::parse("/users/").unwrap();
        assert_eq!(t.render(&Map::new()).unwrap(), "/users/");

        let t = PathTemplate::parse("/users/:id/").unwrap();
        assert_eq!(t.render(&map(json!({"id": 7}))).unwrap(), "/users/7/");
    }

    #[test]
    fn test_render_reports_missing_params() {
        let t = PathTemplate::parse("/users/:id").unwrap();
        let errors = t.render(&Map::new()).unwrap_err();
        assert_eq!(errors.messages_at("params.id"), vec!["is required"]);

        let errors = t.render(&map(json!({"id": {"nested": true}}))).unwrap_err();
        assert_eq!(
            errors.messages_at("params.id"),
            vec!["expected string, got object"]
        );
    }
}
