//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use pactum_core::{ErrorBody, ErrorCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// A buffered response with assertion helpers.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::BodyRead`] if the body cannot be collected.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self::new(parts.status, parts.headers, body))
    }

    /// Creates a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body does not deserialize.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes the body as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body is not JSON.
    pub fn json_value(&self) -> Result<Value, TestError> {
        self.json()
    }

    /// Reads the body as the failure envelope.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body is not an envelope.
    pub fn error_body(&self) -> Result<ErrorBody, TestError> {
        self.json()
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "expected status {expected}, got {} with body {}",
            self.status.as_u16(),
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that the JSON body equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or doesn't match.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        let actual = self.json_value().expect("body should be valid JSON");
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts that the value at a dotted path equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the path is missing or the value doesn't match.
    pub fn assert_json_field(&self, path: &str, expected: &Value) -> &Self {
        let json = self.json_value().expect("body should be valid JSON");
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }

    /// Asserts that the response is a failure envelope with `code`, served
    /// with the code's status.
    ///
    /// # Panics
    ///
    /// Panics if the body is not an envelope or the code or status differ.
    pub fn assert_error_code(&self, code: ErrorCode) -> &Self {
        self.assert_status(code.status().as_u16());
        let body = self.error_body().expect("body should be an error envelope");
        assert_eq!(body.code, code.as_str(), "error code");
        self
    }

    /// Asserts that the envelope's `data` reports at least one message at
    /// the dotted field path, e.g. `params.id`.
    ///
    /// # Panics
    ///
    /// Panics if there is no message at `path`.
    pub fn assert_field_error(&self, path: &str) -> &Self {
        let body = self.error_body().expect("body should be an error envelope");
        let data = body.data.unwrap_or(Value::Null);
        let messages = json_path(&data, path).and_then(Value::as_array);
        assert!(
            messages.is_some_and(|m| !m.is_empty()),
            "no field error at '{path}' in: {data}"
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Follows a dotted path; numeric segments index arrays.
fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match segment.parse::<usize>() {
            Ok(index) if current.is_array() => current.get(index)?,
            _ => current.get(segment)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        TestResponse::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            Bytes::from(body.to_string()),
        )
    }

    #[test]
    fn test_accessors() {
        let response = response(200, json!({"name": "Alice"}));
        assert_eq!(response.status_code(), 200);
        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.json_value().unwrap()["name"], "Alice");
    }

    #[test]
    fn test_assert_error_code_and_field() {
        let response = response(
            422,
            json!({
                "code": "VALIDATION_ERROR",
                "message": "Validation failed",
                "data": {"params": {"id": ["expected integer, got string"]}}
            }),
        );

        response
            .assert_error_code(ErrorCode::ValidationError)
            .assert_field_error("params.id");
    }

    #[test]
    #[should_panic(expected = "no field error")]
    fn test_assert_field_error_missing() {
        let response = response(
            422,
            json!({"code": "VALIDATION_ERROR", "message": "Validation failed", "data": {}}),
        );
        response.assert_field_error("body.name");
    }

    #[test]
    fn test_json_path() {
        let value = json!({"user": {"tags": ["admin", "user"], "0": "zero"}});

        assert_eq!(json_path(&value, "user.tags.1"), Some(&json!("user")));
        assert_eq!(json_path(&value, "user.0"), Some(&json!("zero")));
        assert_eq!(json_path(&value, "missing"), None);
    }
}
