//! Fleet-wide client update publisher.

use crate::observer::{PublishEvent, PublishObserver, TracingObserver};
use crate::publisher::{MessagePublisher, PublishError};
use crate::validation::VersionPolicy;
use fleet_update_proto::{ClientUpdateMessage, TopicScheme, UpdateMessage};
use std::sync::Arc;

/// Announces a new base agent version to every machine in the fleet.
pub struct ClientUpdatePublisher<P> {
    publisher: Arc<P>,
    topic: String,
    policy: VersionPolicy,
    observer: Arc<dyn PublishObserver>,
}

impl<P> Clone for ClientUpdatePublisher<P> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            topic: self.topic.clone(),
            policy: self.policy,
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<P: MessagePublisher> ClientUpdatePublisher<P> {
    /// Create a publisher on the default client update topic.
    #[must_use]
    pub fn new(publisher: Arc<P>) -> Self {
        Self {
            publisher,
            topic: TopicScheme::default()
                .topic_for(ClientUpdateMessage::MESSAGE_TYPE)
                .to_string(),
            policy: VersionPolicy::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Use the client update topic of `scheme`.
    #[must_use]
    pub fn with_topics(mut self, scheme: &TopicScheme) -> Self {
        self.topic = scheme.topic_for(ClientUpdateMessage::MESSAGE_TYPE).to_string();
        self
    }

    /// Use a different input policy.
    #[must_use]
    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report publishes to `observer` instead of the tracing log.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PublishObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Topic this publisher sends on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Announce `version` to all machines.
    ///
    /// # Errors
    ///
    /// Returns the message publisher's error unchanged, or
    /// [`PublishError::InvalidMessage`] if the input policy rejects `version`.
    pub async fn publish(&self, version: &str) -> Result<(), PublishError> {
        let message = ClientUpdateMessage::new(version);
        self.policy.check(&message)?;

        self.publisher.publish(&self.topic, &message).await?;

        self.observer.published(&PublishEvent {
            topic: &self.topic,
            message_type: ClientUpdateMessage::MESSAGE_TYPE,
            version: &message.version,
            tool_agent_id: None,
        });

        Ok(())
    }
}
