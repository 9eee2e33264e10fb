//! Error taxonomy shared by the server dispatcher and the client caller.
//!
//! | Kind | Type | Raised by |
//! |---|---|---|
//! | Construction | [`ContractError`] | contract builder |
//! | Input / output validation | [`ValidationError`] | dispatcher, caller |
//! | Transport | [`RequestError`] | caller |
//! | Remote server | [`ServerError`] | caller |
//!
//! Failures on the wire are always the [`ErrorBody`] envelope
//! `{"code", "message", "data"?}`, and [`ErrorCode`] lists the codes the
//! dispatcher emits together with their HTTP status.

use std::convert::Infallible;
use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::input::InputSource;
use crate::schema::FieldErrors;

/// Which side of an exchange a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Data going into a handler or out to a remote server.
    Input,
    /// Data coming back from a handler or a remote server.
    Output,
}

impl Phase {
    /// Returns the lowercase phase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value failed its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{phase} validation failed: {errors}")]
pub struct ValidationError {
    /// Whether the input or the output was rejected.
    pub phase: Phase,
    /// Field-level errors reported by the schema engine.
    pub errors: FieldErrors,
}

impl ValidationError {
    /// Creates an input-phase validation error.
    #[must_use]
    pub fn input(errors: FieldErrors) -> Self {
        Self {
            phase: Phase::Input,
            errors,
        }
    }

    /// Creates an output-phase validation error.
    #[must_use]
    pub fn output(errors: FieldErrors) -> Self {
        Self {
            phase: Phase::Output,
            errors,
        }
    }

    /// Renders the field errors as a nested tree for response bodies.
    #[must_use]
    pub fn to_tree(&self) -> Value {
        self.errors.to_tree()
    }
}

/// Broad classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestErrorKind {
    /// The request or connection timed out.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The request could not be built (e.g. an unusable URL).
    Builder,
    /// The response body could not be read.
    Body,
    /// Anything else the transport reported.
    Other,
}

/// The HTTP exchange itself failed; no response was classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed ({kind:?}): {reason}")]
pub struct RequestError {
    /// Classification of the failure.
    pub kind: RequestErrorKind,
    /// Transport-provided description.
    pub reason: String,
}

impl RequestError {
    /// Creates a transport error.
    #[must_use]
    pub fn new(kind: RequestErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == RequestErrorKind::Timeout
    }
}

/// Fallback message when a remote error body carries none.
pub const GENERIC_SERVER_ERROR_MESSAGE: &str = "Server error";

/// A remote server answered with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("server responded with {status}: {message}")]
pub struct ServerError {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable code from the response body, if any.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Extra detail from the response body, if any.
    pub data: Option<Value>,
}

impl ServerError {
    /// Decomposes a non-2xx response.
    ///
    /// A JSON object body contributes `code`, `message` and `data`; any other
    /// body becomes an opaque message that embeds the raw text.
    #[must_use]
    pub fn from_response(status: u16, body: &Value, raw: &str) -> Self {
        match body {
            Value::Object(obj) => Self {
                status,
                code: obj.get("code").and_then(Value::as_str).map(str::to_string),
                message: obj
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(GENERIC_SERVER_ERROR_MESSAGE)
                    .to_string(),
                data: obj.get("data").filter(|d| !d.is_null()).cloned(),
            },
            _ => Self {
                status,
                code: None,
                message: format!("{GENERIC_SERVER_ERROR_MESSAGE} (HTTP {status}): {raw}"),
                data: None,
            },
        }
    }

    /// Returns `true` if the remote code matches `code`.
    #[must_use]
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.code.as_deref() == Some(code.as_str())
    }
}

/// Everything a client call can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// Input or output failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The transport failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The remote server answered with a non-2xx status.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// No contract is registered under the requested name.
    #[error("no contract registered as '{0}'")]
    UnknownOperation(String),
}

impl CallError {
    /// Returns the validation phase for validation errors.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Validation(e) => Some(e.phase),
            _ => None,
        }
    }

    /// Returns the HTTP status for remote server errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server(e) => Some(e.status),
            _ => None,
        }
    }
}

/// Error codes emitted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request input failed validation.
    ValidationError,
    /// Handler output failed validation.
    OutputValidationError,
    /// Resource or route not found.
    NotFound,
    /// Caller is not authorized.
    Unauthorized,
    /// Handler failed.
    InternalError,
    /// The contract has no handler.
    HandlerNotImplemented,
    /// The request body is not valid JSON.
    InvalidJson,
    /// The request body exceeds the configured limit.
    PayloadTooLarge,
    /// The request did not complete in time.
    HandlerTimeout,
}

impl ErrorCode {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::OutputValidationError => "OUTPUT_VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::HandlerNotImplemented => "HANDLER_NOT_IMPLEMENTED",
            Self::InvalidJson => "INVALID_JSON",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::HandlerTimeout => "HANDLER_TIMEOUT",
        }
    }

    /// Returns the HTTP status this code is served with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OutputValidationError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::HandlerNotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::InvalidJson => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::HandlerTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Returns the message used when nothing more specific is known.
    #[must_use]
    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Validation failed",
            Self::OutputValidationError => "Response validation failed",
            Self::NotFound => "Resource not found",
            Self::Unauthorized => "Unauthorized",
            Self::InternalError => "Internal server error",
            Self::HandlerNotImplemented => "No handler is attached to this contract",
            Self::InvalidJson => "Malformed JSON body",
            Self::PayloadTooLarge => "Request body too large",
            Self::HandlerTimeout => "Handler execution timed out",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure envelope written to and read from the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field-level detail, typically an error tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorBody {
    /// Creates an envelope with the code's default message.
    #[must_use]
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Replaces the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches detail data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A contract was declared with invalid arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The HTTP method is outside the supported set.
    #[error("invalid enum value: expected one of get, post, put, delete, patch, got '{value}'")]
    InvalidMethod {
        /// The rejected method.
        value: String,
    },

    /// The route path is empty.
    #[error("route path must not be empty")]
    EmptyPath,

    /// The route path is malformed.
    #[error("invalid route path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An input source was declared with a non-object schema.
    #[error("invalid {input_source} schema: expected object, got {found}")]
    InvalidInputSchema {
        /// The offending input source.
        input_source: InputSource,
        /// The kind of schema that was supplied.
        found: &'static str,
    },
}

impl From<Infallible> for ContractError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
