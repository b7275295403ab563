//! Relay CLI: operator tooling for the alert relay.
//!
//! - `watch`: subscribe like a downstream client and print alerts
//! - `simulate`: publish the canned stadium emergencies

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod simulate;
pub mod watch;

use anyhow::Result;
use relay_bus::MessageSource;
use tracing::warn;

/// Poll `source` until it ends, discarding what arrives.
///
/// Publishing over MQTT only makes progress while the connection is
/// polled, so the simulator runs this alongside its publish loop.
pub async fn drive<S>(source: &mut S) -> Result<()>
where
    S: MessageSource + ?Sized,
{
    loop {
        match source.next_message().await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "Connection error");
                return Err(e.into());
            }
        }
    }
}
