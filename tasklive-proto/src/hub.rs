//! Hub wire protocol: JSON frames exchanged between push clients and the
//! Tasklive hub over WebSocket text frames.
//!
//! The protocol is deliberately small: a client authenticates with `Hello`,
//! joins topics, and receives `Event` frames for everything published to
//! those topics. The hub never interprets event payloads beyond JSON
//! validity — authorization lives in the backend that issued the token.

use serde::{Deserialize, Serialize};

use crate::event::TaskEvent;

/// Frames sent from a client to the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// First frame after connecting: presents the session credential.
    /// The hub answers with [`ServerFrame::Welcome`] on success.
    Hello {
        /// Bearer token issued by the backend at login.
        token: String,
    },
    /// Join a topic. Idempotent — joining twice is safe.
    Join {
        /// Topic name, e.g. `tasks`.
        topic: String,
    },
    /// Leave a topic. No-op if not joined.
    Leave {
        /// Topic name.
        topic: String,
    },
    /// Publish an event to everyone else on the topic.
    Publish {
        /// Topic name.
        topic: String,
        /// The event payload.
        event: TaskEvent,
    },
}

/// Frames sent from the hub to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// Handshake acknowledgment.
    Welcome,
    /// An event published on a topic this client joined.
    Event {
        /// Topic the event was published on.
        topic: String,
        /// The event payload.
        event: TaskEvent,
    },
    /// The hub reports an error condition (protocol violation, bad frame).
    Error {
        /// Human-readable error description.
        reason: String,
    },
}

/// Encodes a [`ClientFrame`] as a JSON string.
///
/// # Errors
///
/// Returns an error string if serialization fails.
pub fn encode_client(frame: &ClientFrame) -> Result<String, String> {
    serde_json::to_string(frame).map_err(|e| format!("hub client frame encode error: {e}"))
}

/// Decodes a [`ClientFrame`] from a JSON string.
///
/// # Errors
///
/// Returns an error string if deserialization fails.
pub fn decode_client(text: &str) -> Result<ClientFrame, String> {
    serde_json::from_str(text).map_err(|e| format!("hub client frame decode error: {e}"))
}

/// Encodes a [`ServerFrame`] as a JSON string.
///
/// # Errors
///
/// Returns an error string if serialization fails.
pub fn encode_server(frame: &ServerFrame) -> Result<String, String> {
    serde_json::to_string(frame).map_err(|e| format!("hub server frame encode error: {e}"))
}

/// Decodes a [`ServerFrame`] from a JSON string.
///
/// # Errors
///
/// Returns an error string if deserialization fails.
pub fn decode_server(text: &str) -> Result<ServerFrame, String> {
    serde_json::from_str(text).map_err(|e| format!("hub server frame decode error: {e}"))
}
