//! Prometheus metrics for the alert relay.
//!
//! All metrics follow the naming convention: `alert_relay_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: events received, discarded, alerts created/published
//! - **Histogram**: handling latency per inbound message

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

/// Labels used on `alert_relay_events_discarded_total`.
pub const DISCARD_REASONS: [&str; 5] = [
    "invalid_utf8",
    "malformed_json",
    "validation",
    "encode",
    "internal",
];

/// Labels used on the per-route counters.
pub const ROUTES: [&str; 2] = ["broadcast", "client"];

lazy_static! {
    /// Relay metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Inbound messages handed to the relay
    pub static ref EVENTS_RECEIVED: IntCounter = IntCounter::new(
        "alert_relay_events_received_total",
        "Inbound messages received on the event topic"
    ).expect("metric creation failed");

    /// Inbound messages dropped without an alert
    pub static ref EVENTS_DISCARDED: IntCounterVec = IntCounterVec::new(
        Opts::new("alert_relay_events_discarded_total", "Inbound messages discarded"),
        &["reason"]
    ).expect("metric creation failed");

    /// Alerts derived from valid events
    pub static ref ALERTS_CREATED: IntCounter = IntCounter::new(
        "alert_relay_alerts_created_total",
        "Alerts created from valid events"
    ).expect("metric creation failed");

    /// Alert payloads accepted by the transport
    pub static ref ALERTS_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("alert_relay_alerts_published_total", "Alerts handed to the transport"),
        &["route"]
    ).expect("metric creation failed");

    /// Alert payloads the transport refused
    pub static ref PUBLISH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("alert_relay_publish_failures_total", "Alert publishes that failed"),
        &["route"]
    ).expect("metric creation failed");

    /// Time from receipt to the last publish for one inbound message
    pub static ref PROCESSING_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "alert_relay_processing_duration_seconds",
            "Time spent handling one inbound message"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Proof that the relay metrics are registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

/// Register all relay metrics with [`REGISTRY`].
///
/// Calling it again is a no-op.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENTS_RECEIVED.clone()),
        Box::new(EVENTS_DISCARDED.clone()),
        Box::new(ALERTS_CREATED.clone()),
        Box::new(ALERTS_PUBLISHED.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
        Box::new(PROCESSING_LATENCY.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Point-in-time totals, for the shutdown log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSummary {
    pub events_received: u64,
    pub events_discarded: u64,
    pub alerts_created: u64,
    pub alerts_published: u64,
    pub publish_failures: u64,
}

/// Read the current totals.
#[must_use]
pub fn summary() -> MetricsSummary {
    MetricsSummary {
        events_received: EVENTS_RECEIVED.get(),
        events_discarded: total(&EVENTS_DISCARDED, &DISCARD_REASONS),
        alerts_created: ALERTS_CREATED.get(),
        alerts_published: total(&ALERTS_PUBLISHED, &ROUTES),
        publish_failures: total(&PUBLISH_FAILURES, &ROUTES),
    }
}

fn total(counters: &IntCounterVec, labels: &[&str]) -> u64 {
    labels
        .iter()
        .map(|label| counters.with_label_values(&[*label]).get())
        .sum()
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
