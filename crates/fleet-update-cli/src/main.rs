//! # Fleet Update CLI
//!
//! Announces new client and tool agent versions to the managed fleet.

use anyhow::{Context, Result};
use fleet_update_bus::mqtt::{flush, MqttMessagePublisher};
use fleet_update_bus::Transport;
use fleet_update_core::{
    ClientUpdatePublisher, IntegratedToolAgent, MessagePublisher, PublishError, RecordedMessage,
    RecordingPublisher, ToolAgentUpdatePublisher,
};
use fleet_update_proto::PayloadEncoding;
use rumqttc::{Event, EventLoop, Outgoing};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;

use config::CliConfig;

/// A single update announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Update {
    Client { version: String },
    ToolAgent(IntegratedToolAgent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Publish { update: Update, dry_run: bool },
    Topics,
    Help,
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let dry_run = args.iter().any(|arg| arg == "--dry-run");
    let args: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|arg| *arg != "--dry-run")
        .collect();

    match args.as_slice() {
        [] | ["help" | "--help" | "-h", ..] => Ok(Command::Help),
        ["topics"] => Ok(Command::Topics),
        ["client-update", version] => Ok(Command::Publish {
            update: Update::Client {
                version: (*version).to_string(),
            },
            dry_run,
        }),
        ["client-update", ..] => Err("Usage: fleet-update client-update <version>".to_string()),
        ["tool-update", id, version] => Ok(Command::Publish {
            update: Update::ToolAgent(IntegratedToolAgent::new(*id, *version)),
            dry_run,
        }),
        ["tool-update", ..] => {
            Err("Usage: fleet-update tool-update <tool-agent-id> <version>".to_string())
        }
        [cmd, ..] => Err(format!("Unknown command: {cmd}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{usage}");
            print_help();
            std::process::exit(1);
        }
    };

    match command {
        Command::Help => print_help(),
        Command::Topics => {
            let config = CliConfig::from_env()?;
            println!("client-update  {}", config.topics.client_update());
            println!("tool-update    {}", config.topics.tool_update());
        }
        Command::Publish { update, dry_run } => {
            let config = CliConfig::from_env()?;
            if dry_run {
                dry_run_update(&update, &config).await?;
            } else {
                publish_update(&update, &config).await?;
            }
        }
    }

    Ok(())
}

async fn announce<P: MessagePublisher>(
    publisher: &Arc<P>,
    update: &Update,
    config: &CliConfig,
) -> Result<(), PublishError> {
    match update {
        Update::Client { version } => {
            ClientUpdatePublisher::new(Arc::clone(publisher))
                .with_topics(&config.topics)
                .with_policy(config.validation)
                .publish(version)
                .await
        }
        Update::ToolAgent(agent) => {
            ToolAgentUpdatePublisher::new(Arc::clone(publisher))
                .with_topics(&config.topics)
                .with_policy(config.validation)
                .publish(agent)
                .await
        }
    }
}

async fn dry_run_update(update: &Update, config: &CliConfig) -> Result<()> {
    for line in dry_run_lines(update, config).await? {
        println!("{line}");
    }

    Ok(())
}

/// Topic and wire payload of every message the update would send.
async fn dry_run_lines(update: &Update, config: &CliConfig) -> Result<Vec<String>> {
    let recorder = Arc::new(RecordingPublisher::new());
    announce(&recorder, update, config)
        .await
        .context("Update rejected")?;

    recorder
        .take()
        .iter()
        .map(|message| -> Result<String> {
            let payload = render_payload(message, config.encoding)?;
            Ok(format!("{} {payload}", message.topic))
        })
        .collect()
}

/// JSON payloads print as text, CBOR payloads as hex.
fn render_payload(message: &RecordedMessage, encoding: PayloadEncoding) -> Result<String> {
    let bytes = encoding
        .encode(&message.payload)
        .context("Failed to encode payload")?;

    Ok(match encoding {
        PayloadEncoding::Json => String::from_utf8(bytes).context("JSON payload is not UTF-8")?,
        PayloadEncoding::Cbor => hex::encode(bytes),
    })
}

async fn publish_update(update: &Update, config: &CliConfig) -> Result<()> {
    tracing::info!(
        transport = ?config.transport,
        broker = %config.broker_url,
        "Connecting to message bus"
    );

    match config.transport {
        Transport::Mqtt => {
            let (mqtt, mut eventloop) = MqttMessagePublisher::new(&config.mqtt())
                .context("Failed to create MQTT publisher")?;
            let mqtt = Arc::new(mqtt);

            announce(&mqtt, update, config)
                .await
                .context("Failed to publish update")?;
            flush(&mut eventloop, mqtt.qos(), 1, config.publish_timeout)
                .await
                .context("Broker did not confirm the update")?;

            mqtt.disconnect().await?;
            drain_disconnect(&mut eventloop).await;
        }
        Transport::Nats => publish_nats(update, config).await?,
    }

    Ok(())
}

async fn drain_disconnect(eventloop: &mut EventLoop) {
    let drain = async {
        while let Ok(event) = eventloop.poll().await {
            if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                break;
            }
        }
    };

    if tokio::time::timeout(Duration::from_secs(1), drain).await.is_err() {
        tracing::debug!("Disconnect not confirmed, exiting anyway");
    }
}

#[cfg(feature = "nats")]
async fn publish_nats(update: &Update, config: &CliConfig) -> Result<()> {
    use fleet_update_bus::NatsMessagePublisher;

    let nats = NatsMessagePublisher::connect(&config.broker_url, config.encoding)
        .await
        .context("Failed to connect to NATS")?;
    let nats = Arc::new(nats);

    announce(&nats, update, config)
        .await
        .context("Failed to publish update")?;
    tokio::time::timeout(config.publish_timeout, nats.flush())
        .await
        .map_err(|_| PublishError::Timeout(config.publish_timeout))?
        .context("Failed to flush NATS connection")?;

    Ok(())
}

#[cfg(not(feature = "nats"))]
async fn publish_nats(_update: &Update, _config: &CliConfig) -> Result<()> {
    anyhow::bail!("NATS support not compiled in; rebuild with `--features nats`")
}

fn print_help() {
    println!(
        r"Fleet Update CLI

USAGE:
    fleet-update <COMMAND> [--dry-run]

COMMANDS:
    client-update <version>                 Announce a base agent version to all machines
    tool-update <tool-agent-id> <version>   Announce a tool agent version
    topics                                  Print the topics in effect
    help                                    Show this help message

OPTIONS:
    --dry-run    Print the topic and encoded payload (CBOR as hex) instead of publishing

ENVIRONMENT:
    FLEET_UPDATE_BROKER_URL              Broker URL (default tcp://localhost:1883)
    FLEET_UPDATE_TRANSPORT               mqtt or nats (default: from the URL scheme)
    FLEET_UPDATE_CLIENT_ID               Client identifier (default fleet-update-<uuid>)
    FLEET_UPDATE_QOS                     MQTT QoS level 0, 1 or 2 (default 1)
    FLEET_UPDATE_ENCODING                json or cbor (default json)
    FLEET_UPDATE_VALIDATION              permissive or strict (default permissive)
    FLEET_UPDATE_PUBLISH_TIMEOUT_SECS    Seconds to wait for broker confirmation (default 10)
    FLEET_UPDATE_CLIENT_UPDATE_TOPIC     Client update topic (default machine.all.client-update)
    FLEET_UPDATE_TOOL_UPDATE_TOPIC       Tool update topic (default machine.all.tool-update)

TRANSPORTS:
    nats://              Core NATS (the machine.all.* subjects); needs the `nats` feature,
                         which default builds include
    tcp://, mqtt://      MQTT
    mqtts://, ssl://     MQTT over TLS (default port 8883)

EXAMPLES:
    fleet-update client-update 2.5.0
    fleet-update tool-update tool-42 1.0.3 --dry-run
    FLEET_UPDATE_BROKER_URL=nats://nats.internal:4222 fleet-update client-update 2.5.0
"
    );
}
