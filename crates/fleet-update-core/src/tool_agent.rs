//! Integrated tool agent update publisher.

use crate::observer::{PublishEvent, PublishObserver, TracingObserver};
use crate::publisher::{MessagePublisher, PublishError};
use crate::validation::VersionPolicy;
use fleet_update_proto::{TopicScheme, ToolAgentUpdateMessage, UpdateMessage};
use std::sync::Arc;

/// Reference to an integrated tool agent whose new version is announced.
///
/// Owned by the tool inventory; publishers only read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegratedToolAgent {
    /// Opaque tool agent identifier
    pub id: String,
    /// Version being rolled out
    pub version: String,
}

impl IntegratedToolAgent {
    /// Create a tool agent reference.
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

/// Announces a new version of one integrated tool's agent.
pub struct ToolAgentUpdatePublisher<P> {
    publisher: Arc<P>,
    topic: String,
    policy: VersionPolicy,
    observer: Arc<dyn PublishObserver>,
}

impl<P> Clone for ToolAgentUpdatePublisher<P> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            topic: self.topic.clone(),
            policy: self.policy,
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<P: MessagePublisher> ToolAgentUpdatePublisher<P> {
    /// Create a publisher on the default tool update topic.
    #[must_use]
    pub fn new(publisher: Arc<P>) -> Self {
        Self {
            publisher,
            topic: TopicScheme::default()
                .topic_for(ToolAgentUpdateMessage::MESSAGE_TYPE)
                .to_string(),
            policy: VersionPolicy::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Use the tool update topic of `scheme`.
    #[must_use]
    pub fn with_topics(mut self, scheme: &TopicScheme) -> Self {
        self.topic = scheme.topic_for(ToolAgentUpdateMessage::MESSAGE_TYPE).to_string();
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

    /// Announce the version of `tool_agent` to machines running that tool.
    ///
    /// # Errors
    ///
    /// Returns the message publisher's error unchanged, or
    /// [`PublishError::InvalidMessage`] if the input policy rejects the agent.
    pub async fn publish(&self, tool_agent: &IntegratedToolAgent) -> Result<(), PublishError> {
        let message = ToolAgentUpdateMessage::new(&tool_agent.id, &tool_agent.version);
        self.policy.check(&message)?;

        self.publisher.publish(&self.topic, &message).await?;

        self.observer.published(&PublishEvent {
            topic: &self.topic,
            message_type: ToolAgentUpdateMessage::MESSAGE_TYPE,
            version: &message.version,
            tool_agent_id: Some(&message.tool_agent_id),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingPublisher;
    use fleet_update_proto::MessageType;
    use serde_json::json;

    #[tokio::test]
    async fn publishes_id_and_version_on_tool_topic() {
        let recorder = Arc::new(RecordingPublisher::new());
        let publisher = ToolAgentUpdatePublisher::new(Arc::clone(&recorder));

        publisher
            .publish(&IntegratedToolAgent::new("tool-42", "1.0.3"))
            .await
            .unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "machine.all.tool-update");
        assert_eq!(sent[0].message_type, MessageType::ToolAgentUpdate);
        assert_eq!(
            sent[0].payload,
            json!({ "toolAgentId": "tool-42", "version": "1.0.3" })
        );
    }

    #[tokio::test]
    async fn custom_topic_still_classifies_as_tool_update() {
        let recorder = Arc::new(RecordingPublisher::new());
        let scheme = TopicScheme::new("machine.all.update", "machine.all.update.tools").unwrap();
        let publisher = ToolAgentUpdatePublisher::new(Arc::clone(&recorder)).with_topics(&scheme);

        publisher
            .publish(&IntegratedToolAgent::new("tool-42", "1.0.3"))
            .await
            .unwrap();

        let sent = recorder.sent();
        assert_eq!(sent[0].topic, "machine.all.update.tools");
        assert_eq!(
            scheme.parse(&sent[0].topic),
            Some(MessageType::ToolAgentUpdate)
        );
    }

    #[tokio::test]
    async fn tool_agent_is_left_untouched() {
        let recorder = Arc::new(RecordingPublisher::new());
        let publisher = ToolAgentUpdatePublisher::new(Arc::clone(&recorder));
        let agent = IntegratedToolAgent::new("meshcentral-agent", "1.1.24");

        publisher.publish(&agent).await.unwrap();
        publisher.publish(&agent).await.unwrap();

        assert_eq!(agent, IntegratedToolAgent::new("meshcentral-agent", "1.1.24"));
        assert_eq!(recorder.sent().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_publishes_do_not_interfere() {
        let recorder = Arc::new(RecordingPublisher::new());
        let publisher = ToolAgentUpdatePublisher::new(Arc::clone(&recorder));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let publisher = publisher.clone();
                tokio::spawn(async move {
                    let agent = IntegratedToolAgent::new(format!("tool-{i}"), format!("1.0.{i}"));
                    publisher.publish(&agent).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut ids: Vec<String> = recorder
            .sent()
            .into_iter()
            .map(|m| m.payload["toolAgentId"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        let expected: Vec<String> = (0..8).map(|i| format!("tool-{i}")).collect();
        assert_eq!(ids, expected);
        assert!(recorder
            .sent()
            .iter()
            .all(|m| m.topic == "machine.all.tool-update"));
    }

    #[tokio::test]
    async fn transport_error_propagates_unchanged() {
        let recorder = Arc::new(RecordingPublisher::new());
        recorder.fail_with(PublishError::Serialize("unsupported value".to_string()));
        let publisher = ToolAgentUpdatePublisher::new(Arc::clone(&recorder));

        let err = publisher
            .publish(&IntegratedToolAgent::new("tool-42", "1.0.3"))
            .await
            .unwrap_err();

        assert_eq!(err, PublishError::Serialize("unsupported value".to_string()));
    }

    #[tokio::test]
    async fn strict_policy_rejects_blank_id() {
        let recorder = Arc::new(RecordingPublisher::new());
        let publisher =
            ToolAgentUpdatePublisher::new(Arc::clone(&recorder)).with_policy(VersionPolicy::Strict);

        let err = publisher
            .publish(&IntegratedToolAgent::new(" ", "1.0.3"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::InvalidMessage(_)));
        assert!(recorder.sent().is_empty());
    }
}
