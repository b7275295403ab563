//! Relay CLI: watch alerts or simulate stadium emergencies over MQTT.

use std::time::Duration;

use alert_relay::{ClientId, TopicScheme, DEFAULT_BROADCAST_TOPIC, DEFAULT_CLIENT_TOPIC_PREFIX};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use relay_bus::{connect, MqttBus, MqttConnection, MqttSettings};
use relay_cli::{drive, simulate, watch};
use relay_telemetry::{init_logging, TelemetryConfig};

/// How long to wait for the broker's CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for queued packets to flush on exit.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Relay CLI: operator tools for the alert relay
#[derive(Parser, Debug)]
#[command(name = "relay-cli")]
#[command(about = "Watch alerts or simulate stadium emergencies over MQTT")]
struct Cli {
    /// MQTT broker host
    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    broker: String,

    /// MQTT broker port
    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe to alerts like a downstream client
    Watch {
        /// Client identifier; also selects the per-client topic
        #[arg(long, default_value = "client_123")]
        client_id: String,

        /// Broadcast topic
        #[arg(long, env = "BROADCAST_TOPIC", default_value = DEFAULT_BROADCAST_TOPIC)]
        broadcast_topic: String,

        /// Per-client topic prefix
        #[arg(long, env = "CLIENT_TOPIC_PREFIX", default_value = DEFAULT_CLIENT_TOPIC_PREFIX)]
        client_prefix: String,
    },

    /// Publish the canned stadium emergencies
    Simulate {
        /// Seconds between events
        #[arg(long, default_value_t = 3)]
        interval_secs: u64,

        /// Inbound topic of the relay
        #[arg(long, env = "SIMULATOR_TOPIC", default_value = "stadium/events/emergency")]
        topic: String,
    },
}

impl Cli {
    fn settings(&self, client_id: String) -> MqttSettings {
        MqttSettings {
            host: self.broker.clone(),
            port: self.port,
            client_id,
            ..MqttSettings::default()
        }
    }
}

async fn open(settings: &MqttSettings) -> Result<(MqttBus, MqttConnection)> {
    println!("🔌 Connecting to MQTT broker at {}", settings.address());
    let (bus, mut connection) = connect(settings);
    connection
        .wait_connected(CONNECT_TIMEOUT)
        .await
        .with_context(|| format!("Failed to connect to {}", settings.address()))?;
    println!("✓ Connected successfully");
    Ok((bus, connection))
}

async fn close(bus: MqttBus, connection: MqttConnection) {
    if let Err(e) = bus.disconnect() {
        eprintln!("✗ Failed to disconnect: {e}");
    }
    connection.close(DISCONNECT_TIMEOUT).await;
}

async fn run_watch(cli: &Cli, client_id: &str, broadcast: &str, prefix: &str) -> Result<()> {
    let client = ClientId::new(client_id).context("Invalid client id")?;
    let topics = TopicScheme::new(broadcast, prefix).context("Invalid topic configuration")?;

    println!("👤 Client ID: {client}");
    let (bus, mut connection) = open(&cli.settings(format!("alert_client_{client}"))).await?;
    for filter in watch::watch_filters(&topics, &client)? {
        println!("✓ Subscribed to: {filter}");
        connection.subscribe(filter)?;
    }
    println!("📡 Listening for alerts... (Press Ctrl+C to stop)\n");

    let result = tokio::select! {
        seen = watch::run(&mut connection) => seen.map(|_| ()),
        signal = tokio::signal::ctrl_c() => {
            println!("\n\n👋 Disconnecting...");
            signal.context("Failed to listen for Ctrl+C")
        }
    };

    close(bus, connection).await;
    result
}

async fn run_simulate(cli: &Cli, interval: Duration, topic: &str) -> Result<()> {
    let (bus, mut connection) = open(&cli.settings("stadium_simulator".to_string())).await?;
    println!("📡 Simulating emergency events...\n");

    let mut rng = StdRng::from_entropy();
    let result = tokio::select! {
        sent = simulate::run(&bus, topic, interval, &mut rng) => sent,
        driven = drive(&mut connection) => match driven {
            Ok(()) => Err(anyhow!("Connection closed while simulating")),
            Err(e) => Err(e),
        },
        signal = tokio::signal::ctrl_c() => {
            println!("\n\n👋 Stopping simulator...");
            signal.context("Failed to listen for Ctrl+C").map(|()| 0)
        }
    };

    close(bus, connection).await;
    if let Ok(sent) = &result {
        println!("✓ {sent} test events published");
    }
    result.map(|_| ())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig {
        service_name: "relay-cli".to_string(),
        ..TelemetryConfig::from_env()
    };
    init_logging(&telemetry).context("Failed to initialize logging")?;

    match &cli.command {
        Command::Watch {
            client_id,
            broadcast_topic,
            client_prefix,
        } => run_watch(&cli, client_id, broadcast_topic, client_prefix).await,
        Command::Simulate {
            interval_secs,
            topic,
        } => run_simulate(&cli, Duration::from_secs(*interval_secs), topic).await,
    }
}
