//! # Fleet Update Protocol
//!
//! Wire contract for "new version available" broadcasts sent to managed machines.
//!
//! ## Messages
//!
//! - `ClientUpdateMessage`: base agent update for every machine in the fleet
//! - `ToolAgentUpdateMessage`: update of one integrated tool's agent
//!
//! ## Topics
//!
//! | Topic | Payload |
//! |---|---|
//! | `machine.all.client-update` | `{"version"}` |
//! | `machine.all.tool-update` | `{"toolAgentId", "version"}` |
//!
//! Payloads are JSON by default; CBOR with identical field names is available
//! through [`PayloadEncoding::Cbor`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod messages;
pub mod topics;

pub use encoding::PayloadEncoding;
pub use messages::{ClientUpdateMessage, MessageError, ToolAgentUpdateMessage, UpdateMessage};
pub use topics::{MessageType, TopicError, TopicScheme, CLIENT_UPDATE_TOPIC, TOOL_UPDATE_TOPIC};
