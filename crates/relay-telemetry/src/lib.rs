//! # Relay Telemetry
//!
//! Logging and metrics for the alert relay.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` registry, human or JSON output
//! - **Metrics**: Prometheus counters and a latency histogram in a
//!   crate-local registry, rendered with [`encode_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_SERVICE_NAME` | `alert-relay` | Service name in the startup log |
//! | `RELAY_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `RELAY_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `RELAY_JSON_LOGS` | `true` in containers | JSON log lines |

mod config;
mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, summary, HistogramTimer, MetricsHandle, MetricsSummary,
    ALERTS_CREATED, ALERTS_PUBLISHED, EVENTS_DISCARDED, EVENTS_RECEIVED, PROCESSING_LATENCY,
    PUBLISH_FAILURES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global log subscriber.
///
/// Returns a guard that should be held for the lifetime of the application;
/// dropping it logs the final metric totals.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        let totals = summary();
        tracing::info!(
            events_received = totals.events_received,
            events_discarded = totals.events_discarded,
            alerts_created = totals.alerts_created,
            alerts_published = totals.alerts_published,
            publish_failures = totals.publish_failures,
            "Shutting down telemetry"
        );
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
