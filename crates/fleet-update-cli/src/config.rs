//! CLI configuration.

use anyhow::{anyhow, Context, Result};
use fleet_update_bus::mqtt::parse_qos;
use fleet_update_bus::{MqttPublisherConfig, Transport};
use fleet_update_core::VersionPolicy;
use fleet_update_proto::{PayloadEncoding, TopicScheme, CLIENT_UPDATE_TOPIC, TOOL_UPDATE_TOPIC};
use rumqttc::QoS;
use std::time::Duration;
use uuid::Uuid;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Broker transport
    pub transport: Transport,

    /// Broker URL
    pub broker_url: String,

    /// Client identifier presented to the broker
    pub client_id: String,

    /// MQTT delivery guarantee
    pub qos: QoS,

    /// Payload encoding
    pub encoding: PayloadEncoding,

    /// Input policy for versions and tool agent ids
    pub validation: VersionPolicy,

    /// How long to wait for the broker to confirm a publish
    pub publish_timeout: Duration,

    /// Topics in effect
    pub topics: TopicScheme,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Mqtt,
            broker_url: "tcp://localhost:1883".to_string(),
            client_id: format!("fleet-update-{}", Uuid::new_v4()),
            qos: QoS::AtLeastOnce,
            encoding: PayloadEncoding::Json,
            validation: VersionPolicy::Permissive,
            publish_timeout: Duration::from_secs(10),
            topics: TopicScheme::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FLEET_UPDATE_TRANSPORT`: "mqtt" or "nats" (inferred from the URL if unset)
    /// - `FLEET_UPDATE_BROKER_URL`: Broker URL
    /// - `FLEET_UPDATE_CLIENT_ID`: Client identifier
    /// - `FLEET_UPDATE_QOS`: MQTT QoS level (0, 1 or 2)
    /// - `FLEET_UPDATE_ENCODING`: "json" or "cbor"
    /// - `FLEET_UPDATE_VALIDATION`: "permissive" or "strict"
    /// - `FLEET_UPDATE_PUBLISH_TIMEOUT_SECS`: Confirmation timeout in seconds
    /// - `FLEET_UPDATE_CLIENT_UPDATE_TOPIC`: Client update topic override
    /// - `FLEET_UPDATE_TOOL_UPDATE_TOPIC`: Tool update topic override
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("FLEET_UPDATE_BROKER_URL") {
            config.broker_url = url;
        }

        config.transport = match lookup("FLEET_UPDATE_TRANSPORT") {
            Some(transport) => transport
                .parse::<Transport>()
                .context("Invalid FLEET_UPDATE_TRANSPORT")?,
            None => Transport::infer(&config.broker_url).unwrap_or_default(),
        };

        if let Some(client_id) = lookup("FLEET_UPDATE_CLIENT_ID") {
            config.client_id = client_id;
        }

        if let Some(qos) = lookup("FLEET_UPDATE_QOS") {
            config.qos = parse_qos(&qos).context("Invalid FLEET_UPDATE_QOS")?;
        }

        if let Some(encoding) = lookup("FLEET_UPDATE_ENCODING") {
            config.encoding = encoding
                .parse::<PayloadEncoding>()
                .map_err(|e: String| anyhow!(e))
                .context("Invalid FLEET_UPDATE_ENCODING")?;
        }

        if let Some(validation) = lookup("FLEET_UPDATE_VALIDATION") {
            config.validation = validation
                .parse::<VersionPolicy>()
                .map_err(|e: String| anyhow!(e))
                .context("Invalid FLEET_UPDATE_VALIDATION")?;
        }

        if let Some(secs) = lookup("FLEET_UPDATE_PUBLISH_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .context("Invalid FLEET_UPDATE_PUBLISH_TIMEOUT_SECS")?;
            config.publish_timeout = Duration::from_secs(secs);
        }

        let client_topic = lookup("FLEET_UPDATE_CLIENT_UPDATE_TOPIC");
        let tool_topic = lookup("FLEET_UPDATE_TOOL_UPDATE_TOPIC");
        if client_topic.is_some() || tool_topic.is_some() {
            config.topics = TopicScheme::new(
                client_topic.unwrap_or_else(|| CLIENT_UPDATE_TOPIC.to_string()),
                tool_topic.unwrap_or_else(|| TOOL_UPDATE_TOPIC.to_string()),
            )
            .context("Invalid topic configuration")?;
        }

        Ok(config)
    }

    /// MQTT publisher settings derived from this configuration.
    #[must_use]
    pub fn mqtt(&self) -> MqttPublisherConfig {
        MqttPublisherConfig {
            broker_url: self.broker_url.clone(),
            client_id: self.client_id.clone(),
            qos: self.qos,
            encoding: self.encoding,
            ..MqttPublisherConfig::default()
        }
    }
}
