//! Update message payloads.
//!
//! Messages carry no topic; the topic is chosen by whoever publishes the
//! message kind (see [`crate::TopicScheme::topic_for`]).

use crate::encoding::PayloadEncoding;
use crate::topics::MessageType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Common behavior of every update payload.
pub trait UpdateMessage: Serialize + DeserializeOwned + std::fmt::Debug + Send + Sync {
    /// Kind of update this payload announces.
    const MESSAGE_TYPE: MessageType;

    /// Version subscribers should move to.
    fn version(&self) -> &str;

    /// Integrated tool agent the update is scoped to, if any.
    fn tool_agent_id(&self) -> Option<&str> {
        None
    }

    /// Encode the payload with the given encoding.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    fn encode(&self, encoding: PayloadEncoding) -> Result<Vec<u8>, MessageError> {
        encoding.encode(self)
    }

    /// Decode a payload received on this message's topic.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid payload.
    fn decode(bytes: &[u8], encoding: PayloadEncoding) -> Result<Self, MessageError> {
        encoding.decode(bytes)
    }
}

/// Fleet-wide announcement of a new base agent version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdateMessage {
    /// Target version
    pub version: String,
}

impl ClientUpdateMessage {
    /// Create a new client update message.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl UpdateMessage for ClientUpdateMessage {
    const MESSAGE_TYPE: MessageType = MessageType::ClientUpdate;

    fn version(&self) -> &str {
        &self.version
    }
}

/// Announcement of a new version for one integrated tool's agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAgentUpdateMessage {
    /// Identifier of the integrated tool agent
    pub tool_agent_id: String,
    /// Target version
    pub version: String,
}

impl ToolAgentUpdateMessage {
    /// Create a new tool agent update message.
    #[must_use]
    pub fn new(tool_agent_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tool_agent_id: tool_agent_id.into(),
            version: version.into(),
        }
    }
}

impl UpdateMessage for ToolAgentUpdateMessage {
    const MESSAGE_TYPE: MessageType = MessageType::ToolAgentUpdate;

    fn version(&self) -> &str {
        &self.version
    }

    fn tool_agent_id(&self) -> Option<&str> {
        Some(&self.tool_agent_id)
    }
}

/// Errors for message serialization/deserialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}
