//! Logging and metrics for Pactum.
//!
//! - **Logging**: `tracing` events rendered by `tracing-subscriber` as JSON
//!   or pretty text, filtered by an `EnvFilter`
//! - **Metrics**: counters and histograms via the `metrics` crate, exposed in
//!   Prometheus text format
//!
//! The server and client crates record into these facades unconditionally;
//! nothing is emitted until [`init_telemetry`] (or the individual
//! initializers) install a subscriber and a recorder.
//!
//! # Example
//!
//! ```rust,ignore
//! use pactum_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::production())?;
//! // ... serve requests ...
//! println!("{}", pactum_telemetry::render_metrics().unwrap_or_default());
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, InFlightGuard, MetricsConfig, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_telemetry_disabled() {
        let config = TelemetryConfig::default()
            .with_logging(LogConfig {
                enabled: false,
                ..LogConfig::default()
            })
            .with_metrics(MetricsConfig {
                enabled: false,
                ..MetricsConfig::default()
            });

        assert!(init_telemetry(&config).is_ok());
    }
}
