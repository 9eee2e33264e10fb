//! Server configuration types.
//!
//! # Example
//!
//! ```rust
//! use pactum_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("0.0.0.0:8080")
//!     .request_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "0.0.0.0:8080");
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use pactum_config::ServerSettings;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default request body limit in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] or [`ServerConfig::from_settings`] to
/// construct instances.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080")
    http_addr: String,

    /// How long to wait for in-flight requests on shutdown
    shutdown_timeout: Duration,

    /// Budget for reading the body and running the handler
    request_timeout: Duration,

    /// Largest accepted request body
    max_body_bytes: usize,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Builds a configuration from the `[server]` settings section.
    ///
    /// ```rust
    /// use pactum_config::ServerSettings;
    /// use pactum_server::ServerConfig;
    ///
    /// let settings = ServerSettings {
    ///     http_addr: "127.0.0.1:9000".to_string(),
    ///     ..Default::default()
    /// };
    /// let config = ServerConfig::from_settings(&settings);
    /// assert_eq!(config.http_addr(), "127.0.0.1:9000");
    /// ```
    #[must_use]
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::builder()
            .http_addr(settings.http_addr.clone())
            .shutdown_timeout(settings.shutdown_timeout())
            .request_timeout(settings.request_timeout())
            .max_body_bytes(settings.max_body_bytes)
            .build()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses and returns the HTTP address as a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the request body limit in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Sets the HTTP bind address.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pactum_server::ServerConfigBuilder;
    ///
    /// let builder = ServerConfigBuilder::new()
    ///     .http_addr("0.0.0.0:9090");
    /// ```
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    ///
    /// This is the maximum time the server will wait for in-flight
    /// requests to complete during shutdown.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Requests exceeding it are answered with `504 HANDLER_TIMEOUT`.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the request body limit.
    ///
    /// Larger bodies are answered with `413 PAYLOAD_TOO_LARGE`.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
