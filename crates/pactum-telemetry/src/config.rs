//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Pretty logs at debug level, metrics on.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            metrics: MetricsConfig::default(),
        }
    }

    /// JSON logs at info level, metrics on.
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            metrics: MetricsConfig::default(),
        }
    }

    /// Replaces the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Replaces the metrics configuration.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_presets() {
        assert_eq!(TelemetryConfig::development().logging.format, LogFormat::Pretty);
        assert_eq!(TelemetryConfig::production().logging.format, LogFormat::Json);
    }

    #[test]
    fn test_with_metrics() {
        let config = TelemetryConfig::default().with_metrics(MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        });
        assert!(!config.metrics.enabled);
    }
}
