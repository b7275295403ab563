//! # Inbound Listener
//!
//! Pulls messages from a [`MessageSource`] one at a time and hands each to
//! the relay.
//!
//! ```text
//! source.next_message() ──→ handle() ──→ api.handle_message()
//!        ↑                                      │
//!        └──────────── next message ────────────┘
//! ```
//!
//! Shutdown is only observed between messages; a message that has started
//! processing always finishes.

use std::sync::Arc;

use alert_relay::{AlertRelayApi, RelayOutcome};
use relay_bus::{BusError, BusMessage, MessageSource};
use relay_telemetry::{
    metric_inc, HistogramTimer, ALERTS_CREATED, ALERTS_PUBLISHED, EVENTS_DISCARDED,
    EVENTS_RECEIVED, PROCESSING_LATENCY, PUBLISH_FAILURES,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Drives an [`AlertRelayApi`] from an inbound message source.
pub struct InboundHandler<A: ?Sized> {
    api: Arc<A>,
}

impl<A: AlertRelayApi + ?Sized> InboundHandler<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Process one inbound message, recording metrics.
    ///
    /// Returns the outcome for a valid event, `None` for a discarded one.
    pub async fn handle(&self, message: BusMessage) -> Option<RelayOutcome> {
        metric_inc!(EVENTS_RECEIVED);
        let _timer = HistogramTimer::new(&PROCESSING_LATENCY);

        match self.api.handle_message(&message.topic, &message.payload).await {
            Ok(outcome) => {
                metric_inc!(ALERTS_CREATED);
                for route in &outcome.report.outcomes {
                    if route.is_delivered() {
                        metric_inc!(ALERTS_PUBLISHED, &[route.route.label()]);
                    } else {
                        metric_inc!(PUBLISH_FAILURES, &[route.route.label()]);
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                metric_inc!(EVENTS_DISCARDED, &[e.reason()]);
                None
            }
        }
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped) or
    /// the source is exhausted.
    pub async fn run<S>(
        &self,
        source: &mut S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), BusError>
    where
        S: MessageSource + ?Sized,
    {
        info!("Inbound listener started");

        loop {
            let stop = *shutdown.borrow();
            if stop {
                break;
            }

            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                    continue;
                }
                next = source.next_message() => next,
            };

            match next {
                Ok(Some(message)) => {
                    self.handle(message).await;
                }
                Ok(None) => {
                    warn!("Inbound source closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Inbound source failed");
                    return Err(e);
                }
            }
        }

        info!("Inbound listener stopped");
        Ok(())
    }
}
