//! Core NATS message publisher.

use crate::BusError;
use async_nats::Client;
use async_trait::async_trait;
use fleet_update_core::{MessagePublisher, PublishError};
use fleet_update_proto::{PayloadEncoding, UpdateMessage};

/// Publishes update messages on NATS subjects named after the topic.
///
/// Core NATS is at-most-once: `publish` returns once the message is buffered
/// by the client, and subscribers that are offline miss it. Call
/// [`NatsMessagePublisher::flush`] before exiting a one-shot process.
#[derive(Clone)]
pub struct NatsMessagePublisher {
    client: Client,
    encoding: PayloadEncoding,
}

impl NatsMessagePublisher {
    /// Connect to a NATS server (e.g., <nats://localhost:4222>).
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established.
    pub async fn connect(url: &str, encoding: PayloadEncoding) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect(format!("{url}: {e}")))?;

        tracing::info!(url, "Connected to NATS server");

        Ok(Self { client, encoding })
    }

    /// Wait until buffered messages have been written to the server.
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails while flushing.
    pub async fn flush(&self) -> Result<(), PublishError> {
        self.client
            .flush()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

#[async_trait]
impl MessagePublisher for NatsMessagePublisher {
    async fn publish<M: UpdateMessage>(
        &self,
        topic: &str,
        message: &M,
    ) -> Result<(), PublishError> {
        let payload = message.encode(self.encoding)?;

        tracing::debug!(
            subject = topic,
            payload_len = payload.len(),
            message_type = %M::MESSAGE_TYPE,
            "Publishing update"
        );

        self.client
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            NatsMessagePublisher::connect("nats://127.0.0.1:1", PayloadEncoding::Json),
        )
        .await
        .expect("connect should fail fast when nothing listens");

        assert!(matches!(result, Err(BusError::Connect(_))));
    }
}
