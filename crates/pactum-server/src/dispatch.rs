//! Contract dispatch.
//!
//! Drives one request through a contract:
//!
//! ```text
//! ValidatingInput ──► CallingHandler ──► ValidatingOutput ──► Success(200)
//!        │                  │                   │
//!        ▼                  ▼                   ▼
//!   422 VALIDATION     404 / 401 / 500     500 OUTPUT_VALIDATION
//! ```
//!
//! Every failure is terminal and rendered as the `{"code", "message",
//! "data"?}` envelope.

use std::time::Instant;

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use serde_json::Value;

use pactum_core::schema::ValidateOptions;
use pactum_core::{
    merge_input, Contract, ErrorBody, ErrorCode, HandlerError, RawInput, RequestContext,
    ValidationError,
};
use pactum_telemetry::metrics::{record_dispatch, record_validation_failure};

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// A failure ready to be written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    status: StatusCode,
    body: ErrorBody,
}

impl ErrorResponse {
    /// Creates a failure with the code's status and default message.
    #[must_use]
    pub fn new(code: ErrorCode) -> Self {
        Self {
            status: code.status(),
            body: ErrorBody::new(code),
        }
    }

    /// Replaces the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.body = self.body.with_message(message);
        self
    }

    /// Attaches detail data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.body = self.body.with_data(data);
        self
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the envelope.
    #[must_use]
    pub const fn body(&self) -> &ErrorBody {
        &self.body
    }

    /// Maps a handler's domain error to its HTTP failure.
    #[must_use]
    pub fn from_handler_error(error: &HandlerError) -> Self {
        match error {
            HandlerError::NotFound => Self::new(ErrorCode::NotFound),
            HandlerError::Unauthorized => Self::new(ErrorCode::Unauthorized),
            HandlerError::Message(message) => {
                Self::new(ErrorCode::InternalError).with_message(message.clone())
            }
            HandlerError::Other(_) => Self::new(ErrorCode::InternalError),
        }
    }

    /// Maps a validation error to a 422 or a 500 depending on its phase.
    #[must_use]
    pub fn from_validation_error(error: &ValidationError) -> Self {
        let code = match error.phase {
            pactum_core::Phase::Input => ErrorCode::ValidationError,
            pactum_core::Phase::Output => ErrorCode::OutputValidationError,
        };
        Self::new(code).with_data(error.to_tree())
    }

    /// Renders the HTTP response.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        let body = serde_json::to_vec(&self.body).unwrap_or_default();
        json_response(self.status, body)
    }
}

/// Terminal state of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The handler's (validated) output, served as 200.
    Success(Value),
    /// A failure envelope.
    Failure(ErrorResponse),
}

impl DispatchOutcome {
    /// Returns the HTTP status this outcome is served with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::Failure(err) => err.status(),
        }
    }

    /// Returns the JSON body this outcome is served with.
    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Failure(err) => serde_json::to_value(err.body()).unwrap_or(Value::Null),
        }
    }

    /// Renders the HTTP response.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        match self {
            Self::Success(value) => {
                let body = serde_json::to_vec(&value).unwrap_or_default();
                json_response(StatusCode::OK, body)
            }
            Self::Failure(err) => err.into_response(),
        }
    }
}

/// Runs a request through `contract`.
///
/// Input is validated with coercion; output is validated strictly.
/// A contract without a handler yields `501 HANDLER_NOT_IMPLEMENTED`.
pub async fn dispatch(contract: &Contract, raw: RawInput, ctx: RequestContext) -> DispatchOutcome {
    let started = Instant::now();
    let operation = contract.label();
    let request_id = ctx.request_id();

    let outcome = run(contract, raw, ctx, &operation).await;

    let status = outcome.status().as_u16();
    record_dispatch(&operation, status, started.elapsed());
    tracing::debug!(
        operation = %operation,
        request_id = %request_id,
        status,
        duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "dispatched"
    );

    outcome
}

async fn run(
    contract: &Contract,
    raw: RawInput,
    ctx: RequestContext,
    operation: &str,
) -> DispatchOutcome {
    let Some(handler) = contract.handler_fn() else {
        tracing::warn!(operation = %operation, "no handler attached to contract");
        return DispatchOutcome::Failure(ErrorResponse::new(ErrorCode::HandlerNotImplemented));
    };

    // ValidatingInput
    let input = match merge_input(contract.input_schemas(), &raw) {
        Ok(input) => input,
        Err(err) => {
            record_validation_failure("input", "server");
            tracing::debug!(operation = %operation, errors = %err.errors, "input rejected");
            return DispatchOutcome::Failure(ErrorResponse::from_validation_error(&err));
        }
    };

    // CallingHandler
    let request_id = ctx.request_id();
    let output = match handler(input, ctx).await {
        Ok(output) => output,
        Err(err) => {
            match &err {
                HandlerError::Message(_) | HandlerError::Other(_) => tracing::error!(
                    operation = %operation,
                    request_id = %request_id,
                    error = %err,
                    "handler failed"
                ),
                HandlerError::NotFound | HandlerError::Unauthorized => tracing::debug!(
                    operation = %operation,
                    error = %err,
                    "handler rejected request"
                ),
            }
            return DispatchOutcome::Failure(ErrorResponse::from_handler_error(&err));
        }
    };

    // ValidatingOutput
    let Some(schema) = contract.output_schema() else {
        return DispatchOutcome::Success(output);
    };

    match schema.validate(&output, ValidateOptions::strict()) {
        Ok(validated) => DispatchOutcome::Success(validated),
        Err(errors) => {
            record_validation_failure("output", "server");
            tracing::error!(
                operation = %operation,
                request_id = %request_id,
                errors = %errors,
                "handler output failed validation"
            );
            let err = ValidationError::output(errors);
            DispatchOutcome::Failure(ErrorResponse::from_validation_error(&err))
        }
    }
}

pub(crate) fn json_response(status: StatusCode, body: Vec<u8>) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{InputSchemas, Method, Schema};
    use serde_json::{json, Map};

    fn ctx() -> RequestContext {
        RequestContext::new(Method::Get, "/test")
    }

    fn params(value: Value) -> RawInput {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        RawInput::new().with_params(map)
    }

    fn failing(error: HandlerError) -> Contract {
        Contract::new().handler(move |_input, _ctx| {
            let error = error.clone();
            async move { Err::<Value, _>(error) }
        })
    }

    fn get_user(output: Value) -> Contract {
        Contract::new()
            .route(Method::Get, "/users/:id")
            .unwrap()
            .input(InputSchemas::new().params(Schema::object([("id", Schema::integer())])))
            .unwrap()
            .output(Schema::object([
                ("id", Schema::integer()),
                ("name", Schema::string()),
            ]))
            .handler(move |input, _ctx| {
                let mut output = output.clone();
                if output.get("id").is_some() {
                    output["id"] = input["id"].clone();
                }
                async move { Ok::<_, HandlerError>(output) }
            })
    }

    #[tokio::test]
    async fn test_status_mapping_table() {
        let cases = [
            (HandlerError::NotFound, 404, "NOT_FOUND", "Resource not found".to_string()),
            (HandlerError::Unauthorized, 401, "UNAUTHORIZED", "Unauthorized".to_string()),
            (
                HandlerError::Message("database unavailable".into()),
                500,
                "INTERNAL_ERROR",
                "database unavailable".to_string(),
            ),
            (
                HandlerError::Other(json!({"trace": "secret"})),
                500,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        ];

        for (error, status, code, message) in cases {
            let outcome = dispatch(&failing(error), RawInput::new(), ctx()).await;
            assert_eq!(outcome.status().as_u16(), status);
            let body = outcome.body();
            assert_eq!(body["code"], code);
            assert_eq!(body["message"], message.as_str());
            assert!(body.get("data").is_none());
        }
    }

    #[tokio::test]
    async fn test_input_failure_is_422_with_tree() {
        let contract = get_user(json!({"id": 0, "name": "Bob"}));

        let outcome = dispatch(&contract, params(json!({"id": "abc"})), ctx()).await;

        assert_eq!(outcome.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = outcome.body();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Validation failed");
        assert!(body["data"]["params"]["id"].is_array());
    }

    #[tokio::test]
    async fn test_get_user_success() {
        let contract = get_user(json!({"id": 0, "name": "Bob"}));

        let outcome = dispatch(&contract, params(json!({"id": "123"})), ctx()).await;

        assert_eq!(outcome, DispatchOutcome::Success(json!({"id": 123, "name": "Bob"})));
    }

    #[tokio::test]
    async fn test_get_user_output_failure() {
        let contract = get_user(json!({"name": 42}));

        let outcome = dispatch(&contract, params(json!({"id": "123"})), ctx()).await;

        assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = outcome.body();
        assert_eq!(body["code"], "OUTPUT_VALIDATION_ERROR");
        assert_eq!(body["message"], "Response validation failed");
        assert!(body["data"]["id"].is_array());
        assert!(body["data"]["name"].is_array());
    }

    #[tokio::test]
    async fn test_output_is_validated_without_coercion() {
        let contract = Contract::new()
            .output(Schema::object([("count", Schema::integer())]))
            .handler(|_input, _ctx| async { Ok::<_, HandlerError>(json!({"count": "3"})) });

        let outcome = dispatch(&contract, RawInput::new(), ctx()).await;
        assert_eq!(outcome.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_output_strips_unknown_fields() {
        let contract = Contract::new()
            .output(Schema::object([("id", Schema::integer())]))
            .handler(|_input, _ctx| async {
                Ok::<_, HandlerError>(json!({"id": 1, "password_hash": "x"}))
            });

        let outcome = dispatch(&contract, RawInput::new(), ctx()).await;
        assert_eq!(outcome, DispatchOutcome::Success(json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_no_output_schema_passes_through() {
        let contract = Contract::new()
            .handler(|_input, _ctx| async { Ok::<_, HandlerError>(json!([1, "two", null])) });

        let outcome = dispatch(&contract, RawInput::new(), ctx()).await;
        assert_eq!(outcome, DispatchOutcome::Success(json!([1, "two", null])));
    }

    #[tokio::test]
    async fn test_handler_receives_merged_input() {
        let contract = Contract::new()
            .input(
                InputSchemas::new()
                    .params(Schema::object([("id", Schema::integer())]))
                    .query(Schema::object([("page", Schema::integer().default(1))]))
                    .body(Schema::object([("id", Schema::integer())])),
            )
            .unwrap()
            .handler(|input, _ctx| async move { Ok::<_, HandlerError>(input) });

        let raw = params(json!({"id": "1"})).with_body(json!({"id": 2}));
        let outcome = dispatch(&contract, raw, ctx()).await;

        assert_eq!(outcome, DispatchOutcome::Success(json!({"id": 2, "page": 1})));
    }

    #[tokio::test]
    async fn test_handler_less_contract_is_501() {
        let outcome = dispatch(&Contract::new(), RawInput::new(), ctx()).await;
        assert_eq!(outcome.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(outcome.body()["code"], "HANDLER_NOT_IMPLEMENTED");
    }

    #[tokio::test]
    async fn test_input_failure_skips_handler() {
        let contract = Contract::new()
            .input(InputSchemas::new().query(Schema::object([("q", Schema::string())])))
            .unwrap()
            .handler(|input, _ctx| async move {
                assert!(input.is_null(), "handler must not run");
                Ok::<_, HandlerError>(input)
            });

        let outcome = dispatch(&contract, RawInput::new().with_query(Map::new()), ctx()).await;
        assert_eq!(outcome.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_error_response_into_response() {
        let response = ErrorResponse::new(ErrorCode::NotFound)
            .with_message("Route not found")
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
