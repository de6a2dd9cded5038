//! Hub core: shared state, WebSocket handler, topic membership, and
//! event fan-out.
//!
//! Each connection authenticates with a `Hello` frame, then joins topics
//! and publishes events. A published event is forwarded to every other
//! member of the topic; the publisher never receives its own event back.
//! Events for topics with no members are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc};

use tasklive_proto::hub::{self, ClientFrame, ServerFrame};

/// Shared hub state holding topic membership.
#[derive(Default)]
pub struct HubState {
    /// Maps topic name to the members' message senders, keyed by
    /// connection id.
    topics: RwLock<HashMap<String, HashMap<u64, mpsc::UnboundedSender<Message>>>>,
    /// Source of unique connection ids.
    next_conn_id: AtomicU64,
}

impl HubState {
    /// Creates a hub state with no members.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Adds a connection to a topic. Joining twice is a no-op apart from
    /// refreshing the stored sender.
    pub async fn join(&self, topic: &str, conn_id: u64, sender: mpsc::UnboundedSender<Message>) {
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_default()
            .insert(conn_id, sender);
    }

    /// Removes a connection from a topic.
    pub async fn leave(&self, topic: &str, conn_id: u64) {
        let mut topics = self.topics.write().await;
        if let Some(members) = topics.get_mut(topic) {
            members.remove(&conn_id);
            if members.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// Removes a connection from every topic it joined.
    pub async fn drop_connection(&self, conn_id: u64) {
        let mut topics = self.topics.write().await;
        topics.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Number of members currently joined to a topic.
    pub async fn member_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .get(topic)
            .map_or(0, HashMap::len)
    }

    /// Forwards a frame to every member of a topic except the sender.
    /// Returns the number of members the frame was queued for.
    async fn fan_out(&self, topic: &str, from_conn: u64, frame: &ServerFrame) -> usize {
        let text = match hub::encode_server(frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(err = %e, "failed to encode server frame");
                return 0;
            }
        };

        let topics = self.topics.read().await;
        let Some(members) = topics.get(topic) else {
            tracing::debug!(topic = %topic, "event dropped, topic has no members");
            return 0;
        };

        let mut delivered = 0;
        for (conn_id, sender) in members {
            if *conn_id == from_conn {
                continue;
            }
            if sender.send(Message::Text(text.clone().into())).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Handles an upgraded WebSocket connection.
///
/// The connection lifecycle:
/// 1. Wait for a `Hello` frame carrying a token.
/// 2. Send `Welcome` back.
/// 3. Enter the frame loop, tracking joins and fanning out publishes.
/// 4. On disconnect, drop the connection from all topics.
pub async fn handle_socket(socket: WebSocket, state: Arc<HubState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Wait for the Hello frame.
    if !wait_for_hello(&mut ws_receiver).await {
        tracing::warn!("connection closed before hello");
        return;
    }

    let conn_id = state.next_id();

    let welcome = match hub::encode_server(&ServerFrame::Welcome) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(err = %e, "failed to encode welcome frame");
            return;
        }
    };
    if ws_sender.send(Message::Text(welcome.into())).await.is_err() {
        tracing::warn!(conn = conn_id, "failed to send welcome");
        return;
    }

    tracing::info!(conn = conn_id, "client connected");

    // Channel feeding this connection's WebSocket writer.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Writer task: forward queued frames to the socket.
    let writer_conn = conn_id;
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(conn = writer_conn, "WebSocket write failed");
                break;
            }
        }
    });

    // Reader task: process frames from this client.
    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_frame(conn_id, &text, &tx, &reader_state).await;
                }
                Message::Close(_) => {
                    tracing::info!(conn = conn_id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore binary, ping, pong frames.
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.drop_connection(conn_id).await;
    tracing::info!(conn = conn_id, "client disconnected");
}

/// Waits for the first frame, expecting `Hello`.
///
/// The standalone hub trusts any non-empty token; it exists to fan
/// events out, not to re-verify credentials the REST API already
/// checked.
async fn wait_for_hello(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> bool {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match hub::decode_client(&text) {
                Ok(ClientFrame::Hello { token }) => {
                    if token.is_empty() {
                        tracing::warn!("received hello with empty token");
                        return false;
                    }
                    return true;
                }
                Ok(other) => {
                    tracing::warn!(frame = ?other, "expected hello, got different frame");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(err = %e, "failed to decode hello frame");
                    return false;
                }
            },
            Message::Close(_) => return false,
            _ => {
                // Skip non-text frames (ping/pong) during the handshake.
            }
        }
    }
    false
}

/// Handles one frame from an authenticated client.
async fn handle_frame(
    conn_id: u64,
    text: &str,
    tx: &mpsc::UnboundedSender<Message>,
    state: &Arc<HubState>,
) {
    let frame = match hub::decode_client(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(conn = conn_id, err = %e, "failed to decode frame");
            send_error(tx, format!("malformed frame: {e}"));
            return;
        }
    };

    match frame {
        ClientFrame::Join { topic } => {
            state.join(&topic, conn_id, tx.clone()).await;
            tracing::debug!(conn = conn_id, topic = %topic, "joined topic");
        }
        ClientFrame::Leave { topic } => {
            state.leave(&topic, conn_id).await;
            tracing::debug!(conn = conn_id, topic = %topic, "left topic");
        }
        ClientFrame::Publish { topic, event } => {
            let delivered = state
                .fan_out(&topic, conn_id, &ServerFrame::Event { topic: topic.clone(), event })
                .await;
            tracing::debug!(conn = conn_id, topic = %topic, delivered, "published event");
        }
        ClientFrame::Hello { .. } => {
            tracing::warn!(conn = conn_id, "duplicate hello from connected client");
        }
    }
}

fn send_error(tx: &mpsc::UnboundedSender<Message>, reason: String) {
    if let Ok(text) = hub::encode_server(&ServerFrame::Error { reason }) {
        let _ = tx.send(Message::Text(text.into()));
    }
}

/// Starts the hub on the given address and returns the bound address and
/// a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(HubState::new())).await
}

/// Starts the hub with a pre-built [`HubState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<HubState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "hub server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<HubState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
