//! Test error types.

use thiserror::Error;

/// Errors raised by the test utilities.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// A header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The response body could not be read.
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The test server could not start.
    #[error("failed to start test server: {0}")]
    Spawn(#[from] std::io::Error),
}
