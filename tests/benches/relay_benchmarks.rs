//! # Alert Relay Benchmarks
//!
//! | Stage | Work |
//! |-------|------|
//! | decode | inbound JSON → `EmergencyEvent` |
//! | transform | `EmergencyEvent` → `Alert` (id assignment) |
//! | encode | `Alert` → outbound JSON |
//! | pipeline | raw payload → alert accepted by the sink |

use std::time::Duration;

use alert_relay::{
    decode_event, encode_alert, encode_event, AlertPublisher, AlertRelayApi, AlertRelayService,
    AlertSink, AlertTransformer, EmergencyEvent, EventDetails, EventTimestamp, EventTransform,
    EventType, Severity, SinkError, TileId, TopicScheme,
};
use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

const INBOUND: &str = "stadium/events/emergency";

/// Sink that accepts and drops everything.
struct NullSink;

#[async_trait]
impl AlertSink for NullSink {
    async fn send(&self, _topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        black_box(payload);
        Ok(())
    }
}

fn event(tiles: usize) -> EmergencyEvent {
    EmergencyEvent {
        event_id: "evt_bench".to_string(),
        event_type: EventType::Evacuation,
        timestamp: EventTimestamp::parse("2025-12-09T10:30:00.123456").unwrap(),
        location_id: None,
        location: None,
        severity: Severity::Critical,
        details: Some(EventDetails::new(
            "Evacuation required - all sections",
            (100..100 + tiles as TileId).collect(),
        )),
        metadata: None,
    }
}

// ============================================================================
// CODEC AND TRANSFORM
// ============================================================================

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("relay-stages");
    group.measurement_time(Duration::from_secs(5));

    for tiles in [0usize, 5, 400] {
        let source = event(tiles);
        let payload = encode_event(&source).unwrap();
        let transformer = AlertTransformer::new();
        let alert = transformer.transform(&source);

        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::new("decode_event", tiles), &payload, |b, p| {
            b.iter(|| black_box(decode_event(p).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("transform", tiles), &source, |b, e| {
            b.iter(|| black_box(transformer.transform(e)))
        });
        group.bench_with_input(BenchmarkId::new("encode_alert", tiles), &alert, |b, a| {
            b.iter(|| black_box(encode_alert(a).unwrap()))
        });
    }

    group.finish();
}

// ============================================================================
// FULL PIPELINE
// ============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = AlertRelayService::new(AlertPublisher::new(NullSink, TopicScheme::default()));

    let mut group = c.benchmark_group("relay-pipeline");
    group.measurement_time(Duration::from_secs(5));

    let valid = encode_event(&event(5)).unwrap();
    group.throughput(Throughput::Elements(1));
    group.bench_function("handle_valid", |b| {
        b.iter(|| rt.block_on(async { black_box(service.handle_message(INBOUND, &valid).await) }))
    });

    let invalid = br#"{"event_id":"x","event_type":"EARTHQUAKE","timestamp":"2025-12-09T10:30:00","severity":"HIGH"}"#;
    group.bench_function("handle_rejected", |b| {
        b.iter(|| rt.block_on(async { black_box(service.handle_message(INBOUND, invalid).await) }))
    });

    group.finish();
}

criterion_group!(benches, bench_stages, bench_pipeline);
criterion_main!(benches);
