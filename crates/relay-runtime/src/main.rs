//! # Alert Relay
//!
//! Subscribes to stadium emergency events over MQTT and republishes them as
//! alerts. Configuration comes from the environment (see
//! `container::config`); logging from `RELAY_LOG_LEVEL`/`RUST_LOG`.
//!
//! Exits non-zero if the configuration is invalid or the broker cannot be
//! reached at startup. Runs until SIGINT or SIGTERM.

use anyhow::{Context, Result};
use relay_runtime::{RelayConfig, RelayRuntime};
use relay_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = RelayConfig::from_env().context("Invalid relay configuration")?;

    let runtime = RelayRuntime::new(config);
    runtime.run(shutdown_signal()).await
}
