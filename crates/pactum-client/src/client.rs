//! Contract-validating HTTP client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use pactum_config::ClientSettings;
use pactum_core::{
    validate_sources, CallError, Contract, ContractRegistry, FieldErrors, Phase, RawInput,
    RequestError, RequestErrorKind, RequestId, ServerError, ValidateOptions, ValidationError,
    REQUEST_ID_HEADER,
};
use pactum_telemetry::metrics::{record_client_call, record_validation_failure};

use crate::error::{ClientError, ClientResult};

/// Per-call overrides.
///
/// ```rust
/// use pactum_client::CallOptions;
/// use std::time::Duration;
///
/// let options = CallOptions::new()
///     .header("x-trace", "abc")
///     .timeout(Duration::from_secs(2));
/// assert_eq!(options.timeout_value(), Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl CallOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header. Headers configured on the client take precedence.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the timeout for this call only.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the per-call timeout, if set.
    #[must_use]
    pub fn timeout_value(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Calls remote contracts over HTTP.
///
/// Input is validated before anything is sent and the response is
/// validated before it is returned. Cloning is cheap; clones share the
/// connection pool.
///
/// ```rust,ignore
/// use pactum_client::Client;
/// use pactum_core::RawInput;
///
/// let client = Client::builder().base_url("http://users.internal/api").build()?;
/// let user = client
///     .call(&get_user, RawInput::new().with_params(params))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    headers: HeaderMap,
    http: reqwest::Client,
    registry: Option<Arc<ContractRegistry>>,
}

impl Client {
    /// Creates a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the headers sent with every call.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Calls `contract` with default options.
    ///
    /// # Errors
    ///
    /// See [`Client::call_with`].
    pub async fn call(&self, contract: &Contract, input: RawInput) -> Result<Value, CallError> {
        self.call_with(contract, input, &CallOptions::default()).await
    }

    /// Calls `contract` and deserializes the validated output into `T`.
    ///
    /// # Errors
    ///
    /// See [`Client::call_with`]. A value that does not deserialize into
    /// `T` is an output validation error.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        contract: &Contract,
        input: RawInput,
    ) -> Result<T, CallError> {
        let value = self.call(contract, input).await?;
        serde_json::from_value(value).map_err(|e| {
            ValidationError::output(FieldErrors::single(Vec::new(), e.to_string())).into()
        })
    }

    /// Calls the contract registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnknownOperation`] if the client has no
    /// registry or `name` is not in it; otherwise see
    /// [`Client::call_with`].
    pub async fn call_named(&self, name: &str, input: RawInput) -> Result<Value, CallError> {
        let contract = self
            .registry
            .as_deref()
            .and_then(|registry| registry.get(name))
            .ok_or_else(|| CallError::UnknownOperation(name.to_string()))?;
        self.call(contract, input).await
    }

    /// Calls `contract`.
    ///
    /// # Errors
    ///
    /// - [`CallError::Validation`] with phase `input` before any request is
    ///   sent, or with phase `output` if the response body does not match
    /// - [`CallError::Request`] if the transport fails
    /// - [`CallError::Server`] for any status outside `200..300`
    pub async fn call_with(
        &self,
        contract: &Contract,
        input: RawInput,
        options: &CallOptions,
    ) -> Result<Value, CallError> {
        let started = Instant::now();
        let operation = contract.label();

        let result = self.execute(contract, &input, options, &operation).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => outcome_label(err),
        };
        record_client_call(&operation, outcome, started.elapsed());
        if let Err(CallError::Validation(err)) = &result {
            record_validation_failure(err.phase.as_str(), "client");
        }

        result
    }

    async fn execute(
        &self,
        contract: &Contract,
        input: &RawInput,
        options: &CallOptions,
        operation: &str,
    ) -> Result<Value, CallError> {
        // ValidatingInput
        let validated = validate_sources(contract.input_schemas(), input)?;

        // BuildingRequest
        let path = contract
            .path_template()
            .render(&validated.params)
            .map_err(ValidationError::input)?;
        let url = join_url(&self.base_url, &path);

        let mut request = self
            .http
            .request(contract.method().to_http(), &url)
            .headers(self.headers_for(options)?);

        let query = query_pairs(&validated.query);
        if !query.is_empty() {
            request = request.query(&query);
        }
        if !validated.body.is_empty() {
            request = request.json(&Value::Object(validated.body));
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        // Transporting
        tracing::debug!(operation = %operation, method = %contract.method(), url = %url, "calling");
        let response = request.send().await.map_err(request_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(request_error)?;

        // ClassifyingResponse
        if !(200..300).contains(&status) {
            let body = serde_json::from_str(&text).unwrap_or(Value::Null);
            let err = ServerError::from_response(status, &body, &text);
            tracing::debug!(
                operation = %operation,
                status,
                code = err.code.as_deref().unwrap_or("-"),
                "server returned an error"
            );
            return Err(err.into());
        }

        // ValidatingOutput
        let body = decode_body(&text)?;
        let Some(schema) = contract.output_schema() else {
            return Ok(body);
        };
        schema
            .validate(&body, ValidateOptions::coercing())
            .map_err(|errors| ValidationError::output(errors).into())
    }

    fn headers_for(&self, options: &CallOptions) -> Result<HeaderMap, RequestError> {
        let mut headers = HeaderMap::new();
        if let Ok(id) = HeaderValue::from_str(&RequestId::new().to_string()) {
            headers.insert(REQUEST_ID_HEADER, id);
        }

        for (name, value) in &options.headers {
            let (name, value) = parse_header(name, value)
                .map_err(|reason| RequestError::new(RequestErrorKind::Builder, reason))?;
            headers.insert(name, value);
        }

        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }
}

fn outcome_label(err: &CallError) -> &'static str {
    match err {
        CallError::Validation(e) if e.phase == Phase::Input => "input_invalid",
        CallError::Validation(_) => "output_invalid",
        CallError::Request(_) => "transport_error",
        CallError::Server(_) => "server_error",
        CallError::UnknownOperation(_) => "unknown_operation",
    }
}

fn request_error(err: reqwest::Error) -> RequestError {
    let kind = if err.is_timeout() {
        RequestErrorKind::Timeout
    } else if err.is_connect() {
        RequestErrorKind::Connect
    } else if err.is_builder() {
        RequestErrorKind::Builder
    } else if err.is_body() || err.is_decode() {
        RequestErrorKind::Body
    } else {
        RequestErrorKind::Other
    };
    RequestError::new(kind, err.to_string())
}

/// An empty body decodes to `null`.
fn decode_body(text: &str) -> Result<Value, ValidationError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| {
        ValidationError::output(FieldErrors::single(
            Vec::new(),
            format!("response body is not valid JSON: {e}"),
        ))
    })
}

/// Joins a base URL without a trailing slash and a path with a leading one.
fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Flattens a query object into pairs. Arrays become repeated keys and
/// nulls are dropped.
fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(query.len());
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(|item| (key.clone(), query_text(item))),
            ),
            other => pairs.push((key.clone(), query_text(other))),
        }
    }
    pairs
}

fn query_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), String> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| format!("{name}: {e}"))?;
    let value = HeaderValue::from_str(value).map_err(|e| format!("{name}: {e}"))?;
    Ok((name, value))
}

/// Builder for [`Client`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    registry: Option<Arc<ContractRegistry>>,
}

impl ClientBuilder {
    /// Creates a builder with no base URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the `[client]` settings section.
    #[must_use]
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            headers: settings
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            timeout: settings.timeout(),
            connect_timeout: settings.connect_timeout(),
            registry: None,
        }
    }

    /// Sets the base URL. A trailing slash is stripped.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a header sent with every call.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the default whole-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the registry used by [`Client::call_named`].
    #[must_use]
    pub fn registry(mut self, registry: ContractRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - [`ClientError::MissingBaseUrl`] if no non-blank base URL was set
    /// - [`ClientError::InvalidHeader`] for an unusable header
    /// - [`ClientError::Transport`] if the HTTP client cannot be created
    pub fn build(self) -> ClientResult<Client> {
        let base_url = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ClientError::MissingBaseUrl)?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let (header_name, header_value) =
                parse_header(name, value).map_err(|reason| ClientError::InvalidHeader {
                    name: name.clone(),
                    reason,
                })?;
            headers.insert(header_name, header_value);
        }

        let mut http = reqwest::Client::builder()
            .user_agent(concat!("pactum-client/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            http = http.connect_timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Client {
            base_url,
            headers,
            http,
            registry: self.registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_base_url() {
        assert_eq!(
            Client::builder().build().unwrap_err(),
            ClientError::MissingBaseUrl
        );
        assert_eq!(
            Client::builder().base_url("  ").build().unwrap_err(),
            ClientError::MissingBaseUrl
        );
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let client = Client::builder()
            .base_url("http://host/api/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://host/api");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://host/api", "/users"), "http://host/api/users");
        assert_eq!(join_url("http://host/api/", "/users"), "http://host/api/users");
        assert_eq!(join_url("http://host", "/"), "http://host/");
    }

    #[test]
    fn test_invalid_header() {
        let err = Client::builder()
            .base_url("http://host")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader { ref name, .. } if name == "bad header"));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = ClientSettings {
            base_url: Some("http://api.local/".to_string()),
            timeout_ms: Some(250),
            ..Default::default()
        };
        settings
            .headers
            .insert("x-api-key".to_string(), "secret".to_string());

        let client = ClientBuilder::from_settings(&settings).build().unwrap();

        assert_eq!(client.base_url(), "http://api.local");
        assert_eq!(client.headers().get("x-api-key").unwrap(), "secret");
    }

    #[test]
    fn test_configured_headers_win() {
        let client = Client::builder()
            .base_url("http://host")
            .header("x-tenant", "configured")
            .build()
            .unwrap();

        let options = CallOptions::new()
            .header("x-tenant", "per-call")
            .header("x-extra", "1");
        let headers = client.headers_for(&options).unwrap();

        assert_eq!(headers.get("x-tenant").unwrap(), "configured");
        assert_eq!(headers.get("x-extra").unwrap(), "1");
        assert!(headers.contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn test_query_pairs() {
        let query = json!({"tag": ["a", null, "b"], "page": 2, "skip": null, "q": "x y"});
        let pairs = query_pairs(query.as_object().unwrap());

        assert_eq!(
            pairs,
            vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "x y".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body("").unwrap(), Value::Null);
        assert_eq!(decode_body(" {\"a\":1} ").unwrap(), json!({"a": 1}));

        let err = decode_body("<html>").unwrap_err();
        assert_eq!(err.phase, Phase::Output);
    }

    #[test]
    fn test_outcome_labels() {
        let input = CallError::from(ValidationError::input(FieldErrors::new()));
        let server = CallError::from(ServerError::from_response(500, &Value::Null, ""));
        assert_eq!(outcome_label(&input), "input_invalid");
        assert_eq!(outcome_label(&server), "server_error");
    }
}
