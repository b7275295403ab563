//! # Relay Runtime Library
//!
//! Wiring for the alert relay process. The main entry point is the
//! `alert-relay` binary in `main.rs`; everything it does is exposed here so
//! it can be exercised against the in-memory bus.
//!
//! ## Startup Sequence
//!
//! 1. Load and validate configuration from the environment
//! 2. Connect to the broker; failure or timeout is fatal
//! 3. Subscribe to the inbound topic (re-issued on every reconnect)
//! 4. Run the inbound listener until SIGINT/SIGTERM
//! 5. Disconnect cleanly
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and service construction
//! - `handlers/` - the inbound listener loop

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alert_relay::AlertRelayApi;
use anyhow::{Context, Result};
use relay_bus::{connect, MessageSource};
use tokio::sync::watch;
use tracing::{error, info};

pub use container::{build_service, BusRelayService, ConfigError, RelayConfig};
pub use handlers::InboundHandler;

/// How long shutdown waits for the broker to see our DISCONNECT.
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Run `handler` over `source` until `shutdown` resolves or the source ends.
///
/// When `shutdown` fires, the message being processed (if any) completes
/// before this returns.
pub async fn serve<A, S, F>(handler: &InboundHandler<A>, source: &mut S, shutdown: F) -> Result<()>
where
    A: AlertRelayApi + ?Sized,
    S: MessageSource + ?Sized,
    F: Future<Output = ()>,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let listener = handler.run(source, stop_rx);
    tokio::pin!(listener);
    tokio::pin!(shutdown);

    let result = tokio::select! {
        result = &mut listener => result,
        () = &mut shutdown => {
            info!("Shutdown signal received");
            // Cannot fail: the listener still holds the receiver.
            let _ = stop_tx.send(true);
            listener.await
        }
    };

    result.context("Inbound listener failed")
}

/// The alert relay process.
pub struct RelayRuntime {
    config: RelayConfig,
}

impl RelayRuntime {
    /// Create a runtime for an already validated configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Connect to the broker and relay events until `shutdown` resolves.
    ///
    /// Returns an error if the broker cannot be reached (or refuses us)
    /// within the configured connect timeout.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("===========================================");
        info!("  Alert Relay v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let settings = self.config.mqtt_settings();
        let inbound = self.config.inbound_filter()?;
        let (bus, mut connection) = connect(&settings);
        let bus = Arc::new(bus);

        connection
            .subscribe(inbound.clone())
            .context("Failed to register inbound subscription")?;
        connection
            .wait_connected(self.config.connect_timeout())
            .await
            .with_context(|| format!("Failed to connect to MQTT broker at {}", settings.address()))?;

        let service = build_service(Arc::clone(&bus), &self.config)?;
        let handler = InboundHandler::new(Arc::new(service));

        info!(
            broker = %settings.address(),
            client_id = %settings.client_id,
            inbound = %inbound,
            broadcast = %self.config.topics.broadcast,
            client_prefix = %self.config.topics.client_prefix,
            qos = settings.qos.level(),
            "Alert relay running"
        );

        let result = serve(&handler, &mut connection, shutdown).await;

        if let Err(e) = bus.disconnect() {
            error!(error = %e, "Failed to queue DISCONNECT");
        }
        connection.close(DISCONNECT_TIMEOUT).await;
        info!("Shutdown complete");

        result
    }
}
