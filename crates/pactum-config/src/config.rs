//! Root configuration type.

use serde::{Deserialize, Serialize};

use pactum_telemetry::{LogFormat, TelemetryConfig};

use crate::{ClientSettings, ConfigError, LoggingSettings, MetricsSettings, ServerSettings};

/// Complete Pactum configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use pactum_config::PactumConfig;
///
/// let config = PactumConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.client.base_url.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PactumConfig {
    /// Server host settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Client settings.
    #[serde(default)]
    pub client: ClientSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl PactumConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for the first field that fails:
    /// - `server.http_addr` is not a socket address
    /// - `server.request_timeout_ms` or `server.max_body_bytes` is zero
    /// - `client.base_url` is set but empty or not an http(s) URL
    /// - `logging.level` is not a valid filter directive
    /// - `metrics.histogram_buckets` is empty while metrics are enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if let Some(base_url) = &self.client.base_url {
            if base_url.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "client.base_url",
                    "must not be empty",
                ));
            }
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::invalid_value(
                    "client.base_url",
                    format!("expected an http or https URL: {base_url}"),
                ));
            }
        }

        if self.logging.enabled {
            pactum_telemetry::logging::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        if self.metrics.enabled && self.metrics.histogram_buckets.is_empty() {
            return Err(ConfigError::invalid_value(
                "metrics.histogram_buckets",
                "must not be empty when metrics are enabled",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with ANSI colors.
    ///
    /// ```
    /// use pactum_config::PactumConfig;
    ///
    /// let config = PactumConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config
    }

    /// Production preset: JSON info logs, no colors.
    ///
    /// ```
    /// use pactum_config::{LogFormat, PactumConfig};
    ///
    /// let config = PactumConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config
    }

    /// Builds the telemetry configuration from the logging and metrics
    /// sections.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig::default()
            .with_logging(self.logging.to_log_config())
            .with_metrics(self.metrics.to_metrics_config())
    }
}
