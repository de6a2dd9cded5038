//! Push channel abstraction for live task events.
//!
//! Defines the [`PushChannel`] trait satisfied by:
//! - [`ws::WsChannel`] — WebSocket connection to the event hub
//! - [`loopback::LoopbackChannel`] — in-process pair for testing
//!
//! The channel carries typed [`TaskEvent`]s grouped by topic. Callers join
//! a topic to start receiving its events and publish to fan events out to
//! the other clients on that topic.

pub mod loopback;
pub mod ws;

use tasklive_proto::event::TaskEvent;

/// Errors from push channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The connection to the hub has been closed.
    #[error("channel closed")]
    ConnectionClosed,

    /// The operation timed out before completing.
    #[error("channel operation timed out")]
    Timeout,

    /// The hub rejected or mishandled the opening handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// An underlying I/O error occurred.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Async channel trait for topic-scoped task events.
///
/// Implementations deliver events for every topic the local side has
/// joined. Events published locally are not echoed back — the hub fans
/// them out to the *other* members of the topic.
pub trait PushChannel: Send + Sync {
    /// Start receiving events for a topic.
    fn join(&self, topic: &str)
    -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Stop receiving events for a topic.
    fn leave(
        &self,
        topic: &str,
    ) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Fan an event out to the other members of a topic.
    fn publish(
        &self,
        topic: &str,
        event: &TaskEvent,
    ) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Receive the next event from any joined topic.
    ///
    /// Blocks asynchronously until an event arrives. Returns the topic it
    /// arrived on together with the event.
    fn next_event(
        &self,
    ) -> impl std::future::Future<Output = Result<(String, TaskEvent), ChannelError>> + Send;

    /// Whether the channel currently has a live connection.
    fn is_connected(&self) -> bool;
}
