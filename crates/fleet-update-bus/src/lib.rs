//! # Fleet Update Bus
//!
//! Message publishers that carry update broadcasts over a real broker.
//!
//! - [`mqtt::MqttMessagePublisher`]: MQTT via `rumqttc`
//! - `nats::NatsMessagePublisher`: core NATS via `async-nats` (feature `nats`)
//!
//! Both own payload encoding and delivery semantics; see their type docs for
//! what a successful `publish` guarantees.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mqtt;
#[cfg(feature = "nats")]
pub mod nats;

pub use mqtt::{MqttMessagePublisher, MqttPublisherConfig};
#[cfg(feature = "nats")]
pub use nats::NatsMessagePublisher;

use std::str::FromStr;

/// Broker transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    /// MQTT 3.1.1
    #[default]
    Mqtt,
    /// Core NATS
    Nats,
}

impl Transport {
    /// Guess the transport from a broker URL scheme.
    #[must_use]
    pub fn infer(broker_url: &str) -> Option<Self> {
        let (scheme, _) = broker_url.split_once("://")?;
        match scheme {
            "tcp" | "mqtt" | "mqtts" | "ssl" => Some(Self::Mqtt),
            "nats" | "tls" => Some(Self::Nats),
            _ => None,
        }
    }
}

impl FromStr for Transport {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mqtt" => Ok(Self::Mqtt),
            "nats" => Ok(Self::Nats),
            other => Err(BusError::UnsupportedTransport(other.to_string())),
        }
    }
}

/// Errors for broker setup and shutdown.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    /// Invalid broker URL
    #[error("invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    /// Invalid QoS level
    #[error("invalid QoS level: {0}")]
    InvalidQos(String),
    /// Connection failed
    #[error("connection error: {0}")]
    Connect(String),
    /// Transport not known or not compiled in
    #[error("unsupported transport: {0}")]
    UnsupportedTransport(String),
    /// Disconnect failed
    #[error("disconnect error: {0}")]
    Disconnect(String),
}
