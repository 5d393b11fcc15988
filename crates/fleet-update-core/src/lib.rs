//! # Fleet Update Core
//!
//! Publishers that announce new versions to managed machines.
//!
//! This crate provides:
//! - [`MessagePublisher`]: the send capability both publishers are built on
//! - [`ClientUpdatePublisher`]: base agent updates for the whole fleet
//! - [`ToolAgentUpdatePublisher`]: updates scoped to one integrated tool agent
//! - [`PublishObserver`]: the observability hook fired after each send
//! - [`RecordingPublisher`]: an in-memory capability that records sends
//!
//! Publishers are stateless: every call builds one message, sends it once on
//! the publisher's fixed topic and returns whatever the capability returned.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client_update;
pub mod observer;
pub mod publisher;
pub mod recording;
pub mod tool_agent;
pub mod validation;

pub use client_update::ClientUpdatePublisher;
pub use observer::{PublishEvent, PublishObserver, TracingObserver};
pub use publisher::{MessagePublisher, PublishError};
pub use recording::{RecordedMessage, RecordingPublisher};
pub use tool_agent::{IntegratedToolAgent, ToolAgentUpdatePublisher};
pub use validation::VersionPolicy;
