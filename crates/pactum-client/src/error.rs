//! Client construction errors.

use thiserror::Error;

/// The client could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No base URL was configured, or it was blank.
    #[error("client requires a non-empty base_url")]
    MissingBaseUrl,

    /// A configured header is not a valid HTTP header.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader {
        /// Header name as configured.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Transport(String),
}

/// Result type for client construction.
pub type ClientResult<T> = Result<T, ClientError>;
