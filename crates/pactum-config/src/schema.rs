//! Configuration section types.

use std::time::Duration;

use indexmap::IndexMap;
use pactum_telemetry::{LogConfig, LogFormat, MetricsConfig};
use serde::{Deserialize, Serialize};

/// `[server]` section.
///
/// # Example
///
/// ```
/// use pactum_config::ServerSettings;
///
/// let settings = ServerSettings {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(settings.max_body_bytes, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerSettings {
    /// Returns the shutdown timeout as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// `[client]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientSettings {
    /// Base URL every call is resolved against.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Headers sent with every call. They override per-call headers.
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    /// Whole-call timeout in milliseconds. Unset uses the transport default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Connect timeout in milliseconds. Unset uses the transport default.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

impl ClientSettings {
    /// Returns the call timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Returns the connect timeout, if configured.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g., "info" or "pactum_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Enable ANSI colors in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            ansi_enabled: false,
        }
    }
}

impl LoggingSettings {
    /// Converts to the telemetry crate's logging configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ansi: self.ansi_enabled,
            file_line_info: self.format == LogFormat::Pretty,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[metrics]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSettings {
    /// Enable metrics collection.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Histogram bucket boundaries for durations, in seconds.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

impl MetricsSettings {
    /// Converts to the telemetry crate's metrics configuration.
    #[must_use]
    pub fn to_metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.enabled,
            duration_buckets: self.histogram_buckets.clone(),
        }
    }
}

fn default_histogram_buckets() -> Vec<f64> {
    MetricsConfig::default().duration_buckets
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.http_addr, "0.0.0.0:8080");
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_server_rejects_unknown_fields() {
        let result: Result<ServerSettings, _> = toml::from_str("port = 8080");
        assert!(result.is_err());
    }

    #[test]
    fn test_client_headers_keep_order() {
        let settings: ClientSettings = toml::from_str(
            r#"
            base_url = "http://api.local"
            timeout_ms = 500

            [headers]
            x-b = "2"
            x-a = "1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.base_url.as_deref(), Some("http://api.local"));
        assert_eq!(settings.timeout(), Some(Duration::from_millis(500)));
        assert_eq!(settings.connect_timeout(), None);
        assert_eq!(settings.headers.keys().collect::<Vec<_>>(), vec!["x-b", "x-a"]);
    }

    #[test]
    fn test_logging_to_log_config() {
        let settings = LoggingSettings {
            format: LogFormat::Pretty,
            ansi_enabled: true,
            ..Default::default()
        };
        let config = settings.to_log_config();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.ansi);
        assert!(config.file_line_info);
    }

    #[test]
    fn test_metrics_to_metrics_config() {
        let settings = MetricsSettings {
            enabled: false,
            histogram_buckets: vec![0.5, 1.0],
        };
        let config = settings.to_metrics_config();
        assert!(!config.enabled);
        assert_eq!(config.duration_buckets, vec![0.5, 1.0]);
    }
}
