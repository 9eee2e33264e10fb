//! Prometheus metrics for Pactum.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `pactum_dispatch_total` | Counter | `operation`, `status` | Dispatched requests |
//! | `pactum_dispatch_duration_seconds` | Histogram | `operation` | Dispatch latency |
//! | `pactum_client_calls_total` | Counter | `operation`, `outcome` | Client calls |
//! | `pactum_client_call_duration_seconds` | Histogram | `operation` | Client call latency |
//! | `pactum_validation_failures_total` | Counter | `phase`, `side` | Rejected values |
//! | `pactum_in_flight_requests` | Gauge | - | Requests being served |
//!
//! Recording is a no-op until [`init_metrics`] installs a recorder.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Counter of dispatched requests.
pub const DISPATCH_TOTAL: &str = "pactum_dispatch_total";
/// Histogram of dispatch latency.
pub const DISPATCH_DURATION: &str = "pactum_dispatch_duration_seconds";
/// Counter of client calls.
pub const CLIENT_CALLS_TOTAL: &str = "pactum_client_calls_total";
/// Histogram of client call latency.
pub const CLIENT_CALL_DURATION: &str = "pactum_client_call_duration_seconds";
/// Counter of validation failures.
pub const VALIDATION_FAILURES_TOTAL: &str = "pactum_validation_failures_total";
/// Gauge of requests being served.
pub const IN_FLIGHT_REQUESTS: &str = "pactum_in_flight_requests";

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Histogram buckets for the duration metrics, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Handle to the installed Prometheus recorder.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Returns the registry installed by [`init_metrics`], if any.
    #[must_use]
    pub fn global() -> Option<Self> {
        METRICS_HANDLE.get().map(|handle| Self {
            handle: handle.clone(),
        })
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the global Prometheus recorder.
///
/// Calling this more than once is harmless; later calls keep the first
/// recorder.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for an empty bucket list and
/// `TelemetryError::MetricsInit` if the recorder cannot be installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled || METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(DISPATCH_TOTAL, "Total number of requests dispatched to contracts");
    describe_histogram!(DISPATCH_DURATION, "Contract dispatch duration in seconds");
    describe_counter!(CLIENT_CALLS_TOTAL, "Total number of contract calls made by clients");
    describe_histogram!(CLIENT_CALL_DURATION, "Client call duration in seconds");
    describe_counter!(VALIDATION_FAILURES_TOTAL, "Total values rejected by a schema");
    describe_gauge!(IN_FLIGHT_REQUESTS, "Number of requests currently being served");
}

/// Records a dispatched request.
pub fn record_dispatch(operation: &str, status_code: u16, duration: Duration) {
    counter!(
        DISPATCH_TOTAL,
        "operation" => operation.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(DISPATCH_DURATION, "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Records a finished client call. `outcome` is `"ok"` or the error class.
pub fn record_client_call(operation: &str, outcome: &'static str, duration: Duration) {
    counter!(
        CLIENT_CALLS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(CLIENT_CALL_DURATION, "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Records a validation failure.
///
/// `phase` is `"input"` or `"output"`; `side` is `"server"` or `"client"`.
pub fn record_validation_failure(phase: &'static str, side: &'static str) {
    counter!(VALIDATION_FAILURES_TOTAL, "phase" => phase, "side" => side).increment(1);
}

/// Keeps the in-flight gauge raised for as long as it lives.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.duration_buckets.first(), Some(&0.001));
    }

    #[test]
    fn test_disabled_metrics_do_not_install() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_dispatch("getUser", 200, Duration::from_millis(10));
        record_client_call("getUser", "ok", Duration::from_millis(12));
        record_validation_failure("input", "server");
        drop(InFlightGuard::new());
    }

    #[test]
    fn test_render_after_init() {
        init_metrics(&MetricsConfig::default()).unwrap();
        record_dispatch("renderProbe", 422, Duration::from_millis(3));

        let rendered = render_metrics().unwrap();
        assert!(rendered.contains(DISPATCH_TOTAL));
        assert!(rendered.contains("renderProbe"));
        assert!(MetricsRegistry::global().is_some());
    }
}
