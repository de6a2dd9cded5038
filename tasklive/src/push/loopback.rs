//! Loopback push channel for testing.
//!
//! Uses in-process [`tokio::sync::mpsc`] channels to simulate a hub
//! between two clients. Created via [`LoopbackChannel::create_pair`],
//! which returns two connected endpoints — publishing on one delivers to
//! the other, provided the other side has joined the topic.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use tasklive_proto::event::TaskEvent;

use super::{ChannelError, PushChannel};

/// In-process push channel backed by `tokio::sync::mpsc` channels.
///
/// Mirrors hub semantics: events reach the peer only for topics the peer
/// has joined, and a publisher never receives its own events back.
pub struct LoopbackChannel {
    /// Topics the local side has joined.
    joined: Arc<parking_lot::Mutex<HashSet<String>>>,
    /// Topics the peer has joined. Publishing checks this set.
    peer_joined: Arc<parking_lot::Mutex<HashSet<String>>>,
    /// Sender delivering into the peer's receiver.
    tx: mpsc::Sender<(String, TaskEvent)>,
    /// Receiver fed by the peer's sender.
    rx: Mutex<mpsc::Receiver<(String, TaskEvent)>>,
}

impl LoopbackChannel {
    /// Create a pair of connected loopback channels.
    ///
    /// The `buffer` parameter controls the channel capacity for each
    /// direction.
    pub fn create_pair(buffer: usize) -> (LoopbackChannel, LoopbackChannel) {
        let (tx_a, rx_a) = mpsc::channel(buffer);
        let (tx_b, rx_b) = mpsc::channel(buffer);
        let joined_a = Arc::new(parking_lot::Mutex::new(HashSet::new()));
        let joined_b = Arc::new(parking_lot::Mutex::new(HashSet::new()));

        let a = LoopbackChannel {
            joined: Arc::clone(&joined_a),
            peer_joined: Arc::clone(&joined_b),
            tx: tx_b, // A publishes into B's receiver
            rx: Mutex::new(rx_a),
        };

        let b = LoopbackChannel {
            joined: joined_b,
            peer_joined: joined_a,
            tx: tx_a, // B publishes into A's receiver
            rx: Mutex::new(rx_b),
        };

        (a, b)
    }
}

impl PushChannel for LoopbackChannel {
    async fn join(&self, topic: &str) -> Result<(), ChannelError> {
        self.joined.lock().insert(topic.to_string());
        Ok(())
    }

    async fn leave(&self, topic: &str) -> Result<(), ChannelError> {
        self.joined.lock().remove(topic);
        Ok(())
    }

    async fn publish(&self, topic: &str, event: &TaskEvent) -> Result<(), ChannelError> {
        // The hub drops events for topics with no members, so a peer that
        // never joined simply does not hear about them.
        if !self.peer_joined.lock().contains(topic) {
            return Ok(());
        }
        self.tx
            .send((topic.to_string(), event.clone()))
            .await
            .map_err(|_| ChannelError::ConnectionClosed)
    }

    async fn next_event(&self) -> Result<(String, TaskEvent), ChannelError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(ChannelError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}
