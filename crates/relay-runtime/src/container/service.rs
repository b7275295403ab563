//! Service construction.

use alert_relay::{AlertPublisher, AlertRelayService, BusSink};
use relay_bus::MessagePublisher;

use super::config::{ConfigError, RelayConfig};

/// The relay service publishing through a bus.
pub type BusRelayService<P> = AlertRelayService<BusSink<P>>;

/// Build the relay service on top of `publisher` using the configured
/// topic layout. The alert counter starts at 1.
pub fn build_service<P: MessagePublisher>(
    publisher: P,
    config: &RelayConfig,
) -> Result<BusRelayService<P>, ConfigError> {
    let topics = config.topic_scheme()?;
    Ok(AlertRelayService::new(AlertPublisher::new(
        BusSink::new(publisher),
        topics,
    )))
}
