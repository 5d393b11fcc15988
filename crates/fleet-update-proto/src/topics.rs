//! Topic contract for update broadcasts.
//!
//! Each message kind has exactly one topic. Subscribers listen on these names
//! to receive the matching class of update:
//!
//! - `machine.all.client-update`: base agent updates for every machine
//! - `machine.all.tool-update`: integrated tool agent updates

use serde::{Deserialize, Serialize};

/// Topic for fleet-wide client (base agent) updates.
pub const CLIENT_UPDATE_TOPIC: &str = "machine.all.client-update";

/// Topic for integrated tool agent updates.
pub const TOOL_UPDATE_TOPIC: &str = "machine.all.tool-update";

/// Kinds of update broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    /// Base agent update addressed to the whole fleet
    ClientUpdate,
    /// Update of one integrated tool's agent
    #[serde(rename = "tool-update")]
    ToolAgentUpdate,
}

impl MessageType {
    /// Short name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientUpdate => "client-update",
            Self::ToolAgentUpdate => "tool-update",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid topic configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    /// Topic for the given kind is blank
    #[error("{0} topic is empty")]
    Empty(MessageType),

    /// Both kinds would publish on this topic
    #[error("client and tool updates share topic {0:?}")]
    Shared(String),
}

/// Topic names in effect for a deployment.
///
/// The default scheme uses [`CLIENT_UPDATE_TOPIC`] and [`TOOL_UPDATE_TOPIC`].
/// A scheme is fixed once built; publishers never derive topics from call
/// arguments. Each kind always has its own non-empty topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TopicNames")]
pub struct TopicScheme {
    client_update: String,
    tool_update: String,
}

#[derive(Deserialize)]
struct TopicNames {
    client_update: String,
    tool_update: String,
}

impl TryFrom<TopicNames> for TopicScheme {
    type Error = TopicError;

    fn try_from(names: TopicNames) -> Result<Self, Self::Error> {
        Self::new(names.client_update, names.tool_update)
    }
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self {
            client_update: CLIENT_UPDATE_TOPIC.to_string(),
            tool_update: TOOL_UPDATE_TOPIC.to_string(),
        }
    }
}

impl TopicScheme {
    /// Create a scheme with custom topic names.
    ///
    /// # Errors
    ///
    /// Returns an error if either topic is blank or both kinds would share
    /// one topic.
    pub fn new(
        client_update: impl Into<String>,
        tool_update: impl Into<String>,
    ) -> Result<Self, TopicError> {
        let client_update = client_update.into();
        let tool_update = tool_update.into();

        if client_update.trim().is_empty() {
            return Err(TopicError::Empty(MessageType::ClientUpdate));
        }
        if tool_update.trim().is_empty() {
            return Err(TopicError::Empty(MessageType::ToolAgentUpdate));
        }
        if client_update == tool_update {
            return Err(TopicError::Shared(client_update));
        }

        Ok(Self {
            client_update,
            tool_update,
        })
    }

    /// Topic for fleet-wide client updates.
    #[must_use]
    pub fn client_update(&self) -> &str {
        &self.client_update
    }

    /// Topic for tool agent updates.
    #[must_use]
    pub fn tool_update(&self) -> &str {
        &self.tool_update
    }

    /// Topic carrying messages of the given kind.
    #[must_use]
    pub fn topic_for(&self, message_type: MessageType) -> &str {
        match message_type {
            MessageType::ClientUpdate => &self.client_update,
            MessageType::ToolAgentUpdate => &self.tool_update,
        }
    }

    /// Classify a topic received by a subscriber.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<MessageType> {
        if topic == self.client_update {
            Some(MessageType::ClientUpdate)
        } else if topic == self.tool_update {
            Some(MessageType::ToolAgentUpdate)
        } else {
            None
        }
    }

    /// Every topic a subscriber needs to receive all update kinds.
    #[must_use]
    pub fn subscriptions(&self) -> [&str; 2] {
        [&self.client_update, &self.tool_update]
    }
}
