//! In-memory message publisher that records every send.
//!
//! Used as a test double and by dry runs that should not touch a broker.

use crate::publisher::{MessagePublisher, PublishError};
use async_trait::async_trait;
use fleet_update_proto::{MessageType, UpdateMessage};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A message captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMessage {
    /// Topic passed to `publish`
    pub topic: String,
    /// Kind of the published message
    pub message_type: MessageType,
    /// Payload as JSON
    pub payload: serde_json::Value,
}

/// Records published messages instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<RecordedMessage>>,
    failure: Mutex<Option<PublishError>>,
}

impl RecordingPublisher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent publish with `error`.
    pub fn fail_with(&self, error: PublishError) {
        *lock(&self.failure) = Some(error);
    }

    /// Stop failing publishes.
    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Messages recorded so far, in call order.
    #[must_use]
    pub fn sent(&self) -> Vec<RecordedMessage> {
        lock(&self.sent).clone()
    }

    /// Drain recorded messages.
    pub fn take(&self) -> Vec<RecordedMessage> {
        std::mem::take(&mut *lock(&self.sent))
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish<M: UpdateMessage>(
        &self,
        topic: &str,
        message: &M,
    ) -> Result<(), PublishError> {
        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }

        let payload =
            serde_json::to_value(message).map_err(|e| PublishError::Serialize(e.to_string()))?;

        lock(&self.sent).push(RecordedMessage {
            topic: topic.to_string(),
            message_type: M::MESSAGE_TYPE,
            payload,
        });

        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
