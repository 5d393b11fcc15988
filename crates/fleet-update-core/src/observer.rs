//! Observability hook fired after each successful publish.

use fleet_update_proto::MessageType;

/// What was published, for operational traceability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishEvent<'a> {
    /// Topic the message was sent on
    pub topic: &'a str,
    /// Kind of update
    pub message_type: MessageType,
    /// Announced version
    pub version: &'a str,
    /// Tool agent the update is scoped to, if any
    pub tool_agent_id: Option<&'a str>,
}

/// Receives one event per successful publish.
pub trait PublishObserver: Send + Sync {
    /// Called after the message publisher accepted a message.
    fn published(&self, event: &PublishEvent<'_>);
}

/// Observer that emits an info-level `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PublishObserver for TracingObserver {
    fn published(&self, event: &PublishEvent<'_>) {
        match event.tool_agent_id {
            Some(tool_agent_id) => tracing::info!(
                topic = event.topic,
                tool_agent_id,
                version = event.version,
                "Published tool update message"
            ),
            None => tracing::info!(
                topic = event.topic,
                version = event.version,
                "Published client update message for all machines"
            ),
        }
    }
}
