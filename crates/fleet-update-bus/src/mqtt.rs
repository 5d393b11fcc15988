//! MQTT message publisher.

use crate::BusError;
use async_trait::async_trait;
use fleet_update_core::{MessagePublisher, PublishError};
use fleet_update_proto::{PayloadEncoding, UpdateMessage};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MQTTS_PORT: u16 = 8883;

/// Configuration for the MQTT publisher.
#[derive(Debug, Clone)]
pub struct MqttPublisherConfig {
    /// MQTT broker URL (e.g., <tcp://localhost:1883>, or <mqtts://host> for TLS)
    pub broker_url: String,
    /// Client ID for the MQTT connection
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Delivery guarantee requested from the broker
    pub qos: QoS,
    /// Ask the broker to retain the last update per topic
    pub retain: bool,
    /// Payload encoding
    pub encoding: PayloadEncoding,
    /// Capacity of the client's outgoing request queue
    pub request_capacity: usize,
}

impl Default for MqttPublisherConfig {
    fn default() -> Self {
        Self {
            broker_url: "tcp://localhost:1883".to_string(),
            client_id: "fleet-update-publisher".to_string(),
            keep_alive: Duration::from_secs(30),
            qos: QoS::AtLeastOnce,
            retain: false,
            encoding: PayloadEncoding::Json,
            request_capacity: 100,
        }
    }
}

/// Publishes update messages over MQTT.
///
/// `publish` returns once the encoded message is queued on the client. The
/// message only reaches the broker while the returned [`EventLoop`] is being
/// polled, either by [`spawn_event_loop`] in a long-running service or by
/// [`flush`] in a one-shot process. Broker acknowledgements follow the
/// configured QoS; the event loop reconnects after transport errors.
#[derive(Clone)]
pub struct MqttMessagePublisher {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
    encoding: PayloadEncoding,
}

impl MqttMessagePublisher {
    /// Create a new MQTT publisher and its event loop.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid.
    pub fn new(config: &MqttPublisherConfig) -> Result<(Self, EventLoop), BusError> {
        let broker = BrokerAddress::parse(&config.broker_url)?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, broker.host, broker.port);
        mqtt_options.set_keep_alive(config.keep_alive);
        if broker.tls {
            mqtt_options.set_transport(rumqttc::Transport::tls_with_default_config());
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options, config.request_capacity);

        Ok((
            Self {
                client,
                qos: config.qos,
                retain: config.retain,
                encoding: config.encoding,
            },
            eventloop,
        ))
    }

    /// Delivery guarantee used for every publish.
    #[must_use]
    pub fn qos(&self) -> QoS {
        self.qos
    }

    /// Queue a disconnect request.
    ///
    /// # Errors
    ///
    /// Returns error if the event loop is gone.
    pub async fn disconnect(&self) -> Result<(), BusError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| BusError::Disconnect(e.to_string()))
    }
}

#[async_trait]
impl MessagePublisher for MqttMessagePublisher {
    async fn publish<M: UpdateMessage>(
        &self,
        topic: &str,
        message: &M,
    ) -> Result<(), PublishError> {
        let payload = message.encode(self.encoding)?;

        tracing::debug!(
            topic,
            payload_len = payload.len(),
            message_type = %M::MESSAGE_TYPE,
            "Publishing update"
        );

        self.client
            .publish(topic, self.qos, self.retain, payload)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

/// Drive the event loop in the background for the life of the process.
///
/// Transport errors are logged and polling resumes after a delay, which
/// makes the client reconnect.
pub fn spawn_event_loop(mut eventloop: EventLoop) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("Connected to MQTT broker");
                }
                Ok(Event::Incoming(Packet::PubAck(ack))) => {
                    tracing::debug!(pkid = ack.pkid, "Publish acknowledged");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::info!("Disconnecting from MQTT broker");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "MQTT error");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    })
}

/// Poll the event loop until `expected` publishes are confirmed at `qos`.
///
/// Confirmation means the packet was written for QoS 0, `PubAck` for QoS 1
/// and `PubComp` for QoS 2.
///
/// # Errors
///
/// Returns [`PublishError::Transport`] on the first connection error and
/// [`PublishError::Timeout`] if confirmations do not arrive within `limit`.
pub async fn flush(
    eventloop: &mut EventLoop,
    qos: QoS,
    expected: usize,
    limit: Duration,
) -> Result<(), PublishError> {
    let wait = async {
        let mut confirmed = 0;
        while confirmed < expected {
            let event = eventloop
                .poll()
                .await
                .map_err(|e| PublishError::Transport(e.to_string()))?;
            if is_confirmation(&event, qos) {
                confirmed += 1;
                tracing::debug!(confirmed, expected, "Publish confirmed");
            }
        }
        Ok(())
    };

    tokio::time::timeout(limit, wait)
        .await
        .map_err(|_| PublishError::Timeout(limit))?
}

fn is_confirmation(event: &Event, qos: QoS) -> bool {
    matches!(
        (qos, event),
        (QoS::AtMostOnce, Event::Outgoing(Outgoing::Publish(_)))
            | (QoS::AtLeastOnce, Event::Incoming(Packet::PubAck(_)))
            | (QoS::ExactlyOnce, Event::Incoming(Packet::PubComp(_)))
    )
}

/// Parse a QoS level given as `0`/`1`/`2` or by name.
///
/// # Errors
///
/// Returns error for anything else.
pub fn parse_qos(input: &str) -> Result<QoS, BusError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "0" | "at-most-once" => Ok(QoS::AtMostOnce),
        "1" | "at-least-once" => Ok(QoS::AtLeastOnce),
        "2" | "exactly-once" => Ok(QoS::ExactlyOnce),
        other => Err(BusError::InvalidQos(other.to_string())),
    }
}

/// Broker endpoint from `scheme://host[:port]` or a bare `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BrokerAddress {
    host: String,
    port: u16,
    tls: bool,
}

impl BrokerAddress {
    fn parse(input: &str) -> Result<Self, BusError> {
        let invalid = |reason: String| BusError::InvalidBrokerUrl(format!("{input}: {reason}"));

        let url = if input.contains("://") {
            Url::parse(input)
        } else {
            Url::parse(&format!("tcp://{input}"))
        }
        .map_err(|e| invalid(e.to_string()))?;

        let tls = match url.scheme() {
            "tcp" | "mqtt" => false,
            "mqtts" | "ssl" => true,
            scheme => return Err(invalid(format!("unsupported scheme '{scheme}'"))),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let port = url
            .port()
            .unwrap_or(if tls { DEFAULT_MQTTS_PORT } else { DEFAULT_MQTT_PORT });

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_update_proto::{ClientUpdateMessage, CLIENT_UPDATE_TOPIC};

    fn address(input: &str) -> (String, u16, bool) {
        let broker = BrokerAddress::parse(input).unwrap();
        (broker.host, broker.port, broker.tls)
    }

    #[test]
    fn broker_address_from_url() {
        assert_eq!(address("tcp://localhost:1883"), ("localhost".into(), 1883, false));
        assert_eq!(
            address("mqtt://broker.example.com"),
            ("broker.example.com".into(), 1883, false)
        );
    }

    #[test]
    fn broker_address_without_scheme() {
        assert_eq!(address("10.0.0.5:8883"), ("10.0.0.5".into(), 8883, false));
        assert_eq!(address("broker"), ("broker".into(), 1883, false));
    }

    #[test]
    fn tls_schemes_default_to_secure_port() {
        assert_eq!(
            address("mqtts://broker.example.com"),
            ("broker.example.com".into(), 8883, true)
        );
        assert_eq!(
            address("ssl://broker.example.com:9883"),
            ("broker.example.com".into(), 9883, true)
        );
    }

    #[test]
    fn broker_address_rejects_other_schemes() {
        assert!(matches!(
            BrokerAddress::parse("nats://localhost:4222"),
            Err(BusError::InvalidBrokerUrl(_))
        ));
        assert!(BrokerAddress::parse("localhost:port").is_err());
        assert!(BrokerAddress::parse("tcp://").is_err());
    }

    #[test]
    fn parse_qos_levels() {
        assert_eq!(parse_qos("0").unwrap(), QoS::AtMostOnce);
        assert_eq!(parse_qos("at-least-once").unwrap(), QoS::AtLeastOnce);
        assert_eq!(parse_qos(" 2 ").unwrap(), QoS::ExactlyOnce);
        assert!(parse_qos("3").is_err());
    }

    #[test]
    fn confirmation_depends_on_qos() {
        let written = Event::Outgoing(Outgoing::Publish(1));

        assert!(is_confirmation(&written, QoS::AtMostOnce));
        assert!(!is_confirmation(&written, QoS::AtLeastOnce));
    }

    #[tokio::test]
    async fn publish_queues_on_client() {
        let (publisher, _eventloop) =
            MqttMessagePublisher::new(&MqttPublisherConfig::default()).unwrap();

        publisher
            .publish(CLIENT_UPDATE_TOPIC, &ClientUpdateMessage::new("2.5.0"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn publish_fails_without_event_loop() {
        let (publisher, eventloop) =
            MqttMessagePublisher::new(&MqttPublisherConfig::default()).unwrap();
        drop(eventloop);

        let err = publisher
            .publish(CLIENT_UPDATE_TOPIC, &ClientUpdateMessage::new("2.5.0"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Transport(_)));
    }

    #[tokio::test]
    async fn flush_with_nothing_pending_returns_immediately() {
        let (_publisher, mut eventloop) =
            MqttMessagePublisher::new(&MqttPublisherConfig::default()).unwrap();

        flush(&mut eventloop, QoS::AtLeastOnce, 0, Duration::from_millis(10))
            .await
            .unwrap();
    }
}
