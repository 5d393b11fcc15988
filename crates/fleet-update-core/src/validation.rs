//! Input policy applied before a message is handed to the transport.

use crate::publisher::PublishError;
use fleet_update_proto::UpdateMessage;
use std::str::FromStr;

/// How strictly publishers check update messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Send whatever the caller supplied, including empty versions
    #[default]
    Permissive,
    /// Reject blank versions or tool agent ids, and versions containing
    /// whitespace or control characters
    Strict,
}

impl VersionPolicy {
    /// Check a message against this policy.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidMessage`] if the message is rejected.
    pub fn check<M: UpdateMessage>(self, message: &M) -> Result<(), PublishError> {
        if self == Self::Permissive {
            return Ok(());
        }

        let version = message.version();
        if version.trim().is_empty() {
            return Err(PublishError::InvalidMessage("version is empty".to_string()));
        }
        if version
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(PublishError::InvalidMessage(format!(
                "version '{}' contains whitespace or control characters",
                version.escape_debug()
            )));
        }

        if let Some(id) = message.tool_agent_id() {
            if id.trim().is_empty() {
                return Err(PublishError::InvalidMessage(
                    "tool agent id is empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl FromStr for VersionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown validation policy '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_update_proto::{ClientUpdateMessage, ToolAgentUpdateMessage};

    #[test]
    fn permissive_accepts_anything() {
        let policy = VersionPolicy::Permissive;

        assert!(policy.check(&ClientUpdateMessage::new("")).is_ok());
        assert!(policy.check(&ToolAgentUpdateMessage::new("", " ")).is_ok());
    }

    #[test]
    fn strict_rejects_blank_values() {
        let policy = VersionPolicy::Strict;

        assert!(matches!(
            policy.check(&ClientUpdateMessage::new("   ")),
            Err(PublishError::InvalidMessage(_))
        ));
        assert!(matches!(
            policy.check(&ToolAgentUpdateMessage::new("", "1.0.3")),
            Err(PublishError::InvalidMessage(_))
        ));
        assert!(matches!(
            policy.check(&ClientUpdateMessage::new("2.5.0 beta")),
            Err(PublishError::InvalidMessage(_))
        ));
    }

    #[test]
    fn strict_accepts_build_versions() {
        let policy = VersionPolicy::Strict;

        assert!(policy.check(&ClientUpdateMessage::new("2.5.0-rc.1+build.7")).is_ok());
        assert!(policy
            .check(&ToolAgentUpdateMessage::new("tool-42", "1.0.3"))
            .is_ok());
    }

    #[test]
    fn parse_policy_names() {
        assert_eq!("Strict".parse(), Ok(VersionPolicy::Strict));
        assert_eq!("permissive".parse(), Ok(VersionPolicy::Permissive));
        assert!("lenient".parse::<VersionPolicy>().is_err());
    }
}
