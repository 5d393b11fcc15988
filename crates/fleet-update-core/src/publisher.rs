//! The message publishing capability.

use async_trait::async_trait;
use fleet_update_proto::{MessageError, UpdateMessage};
use std::sync::Arc;
use std::time::Duration;

/// Sends an update message to a named topic.
///
/// Implementations own payload serialization, delivery semantics and any
/// transport-level retry or reconnection. They must document what a returned
/// `Ok(())` guarantees (queued locally, flushed to the server, acknowledged by
/// the broker), since callers decide whether to retry based on it.
///
/// Implementations are shared between publishers and tasks and must be safe
/// for concurrent use.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish one message on `topic`.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be serialized or handed to the
    /// transport.
    async fn publish<M: UpdateMessage>(&self, topic: &str, message: &M)
        -> Result<(), PublishError>;
}

#[async_trait]
impl<P: MessagePublisher> MessagePublisher for Arc<P> {
    async fn publish<M: UpdateMessage>(
        &self,
        topic: &str,
        message: &M,
    ) -> Result<(), PublishError> {
        (**self).publish(topic, message).await
    }
}

/// Errors surfaced by a publish call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Payload could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Transport rejected or could not carry the message
    #[error("transport error: {0}")]
    Transport(String),
    /// Transport did not confirm the message in time
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
    /// Message rejected by the publisher's input policy
    #[error("invalid update message: {0}")]
    InvalidMessage(String),
}

impl From<MessageError> for PublishError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Serialize(msg) | MessageError::Deserialize(msg) => Self::Serialize(msg),
        }
    }
}
