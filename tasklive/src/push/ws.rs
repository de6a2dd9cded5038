//! WebSocket push channel connected to the event hub.
//!
//! Implements [`PushChannel`] over a WebSocket carrying JSON frames. The
//! opening handshake authenticates with the session token before any
//! topic traffic flows.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use tasklive_proto::event::TaskEvent;
use tasklive_proto::hub::{self, ClientFrame, ServerFrame};

use super::{ChannelError, PushChannel};

/// Write half of the WebSocket connection.
type WsSink = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Read half of the WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Default timeout for connecting to the hub.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for waiting for the `Welcome` acknowledgment.
const HELLO_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket push channel implementing [`PushChannel`].
///
/// Created via [`WsChannel::connect`], which establishes the WebSocket
/// connection, authenticates, and spawns a background reader task that
/// feeds decoded events into an internal queue.
pub struct WsChannel {
    /// The hub URL (ws:// or wss://).
    hub_url: String,
    /// Write half of the connection (shared for concurrent sends).
    sink: Arc<Mutex<WsSink>>,
    /// Channel fed by the background reader task.
    incoming: Mutex<mpsc::Receiver<(String, TaskEvent)>>,
    /// Whether the connection to the hub is active.
    connected: Arc<AtomicBool>,
    /// Background reader task, kept alive for the channel's lifetime.
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl WsChannel {
    /// Connect to the hub and authenticate.
    ///
    /// Performs the following steps:
    /// 1. Establishes a WebSocket connection to `hub_url` (10s timeout)
    /// 2. Sends a `Hello` frame carrying the session token
    /// 3. Waits for a `Welcome` acknowledgment (5s timeout)
    /// 4. Spawns a background task to read incoming events
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Timeout`] if the connect or handshake times out.
    /// - [`ChannelError::Handshake`] if the hub rejects the token or sends
    ///   an unexpected frame.
    /// - [`ChannelError::Io`] for TCP/TLS failures.
    pub async fn connect(hub_url: &str, token: &str) -> Result<Self, ChannelError> {
        let (ws_stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(hub_url))
            .await
            .map_err(|_| {
                tracing::warn!(url = hub_url, "hub WebSocket connect timed out");
                ChannelError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url = hub_url, err = %e, "hub WebSocket connect failed");
                ChannelError::Io(std::io::Error::other(e))
            })?;

        let (mut sink, mut reader) = ws_stream.split();

        let hello = hub::encode_client(&ClientFrame::Hello {
            token: token.to_string(),
        })
        .map_err(ChannelError::Codec)?;
        sink.send(Message::Text(hello.into())).await.map_err(|e| {
            tracing::warn!(err = %e, "failed to send hello frame");
            ChannelError::Io(std::io::Error::other(e))
        })?;

        Self::await_welcome(&mut reader, hub_url).await?;

        let (tx, rx) = mpsc::channel(256);
        let connected = Arc::new(AtomicBool::new(true));
        let reader_connected = Arc::clone(&connected);
        let reader_handle = tokio::spawn(reader_loop(reader, tx, reader_connected));

        Ok(Self {
            hub_url: hub_url.to_string(),
            sink: Arc::new(Mutex::new(sink)),
            incoming: Mutex::new(rx),
            connected,
            _reader_handle: reader_handle,
        })
    }

    async fn await_welcome(reader: &mut WsReader, hub_url: &str) -> Result<(), ChannelError> {
        let ack = tokio::time::timeout(HELLO_TIMEOUT, reader.next())
            .await
            .map_err(|_| {
                tracing::warn!(url = hub_url, "hub handshake timed out");
                ChannelError::Timeout
            })?;

        match ack {
            Some(Ok(Message::Text(text))) => match hub::decode_server(&text) {
                Ok(ServerFrame::Welcome) => {
                    tracing::info!(url = hub_url, "authenticated with event hub");
                    Ok(())
                }
                Ok(ServerFrame::Error { reason }) => {
                    tracing::warn!(reason = %reason, "hub rejected handshake");
                    Err(ChannelError::Handshake(reason))
                }
                Ok(other) => {
                    tracing::warn!(?other, "unexpected hub frame during handshake");
                    Err(ChannelError::Handshake(
                        "unexpected frame before welcome".to_string(),
                    ))
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed hub handshake frame");
                    Err(ChannelError::Codec(e))
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                tracing::warn!("hub closed connection during handshake");
                Err(ChannelError::ConnectionClosed)
            }
            Some(Ok(_)) => Err(ChannelError::Handshake(
                "unexpected non-text frame during handshake".to_string(),
            )),
            Some(Err(e)) => {
                tracing::warn!(err = %e, "WebSocket error during handshake");
                Err(ChannelError::Io(std::io::Error::other(e)))
            }
        }
    }

    /// The hub URL this channel is connected to.
    pub fn hub_url(&self) -> &str {
        &self.hub_url
    }

    async fn send_frame(&self, frame: &ClientFrame) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(ChannelError::ConnectionClosed);
        }
        let text = hub::encode_client(frame).map_err(ChannelError::Codec)?;
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into())).await.map_err(|e| {
            tracing::warn!(err = %e, "hub send failed");
            self.connected.store(false, Ordering::Relaxed);
            ChannelError::ConnectionClosed
        })
    }
}

impl PushChannel for WsChannel {
    async fn join(&self, topic: &str) -> Result<(), ChannelError> {
        self.send_frame(&ClientFrame::Join {
            topic: topic.to_string(),
        })
        .await
    }

    async fn leave(&self, topic: &str) -> Result<(), ChannelError> {
        self.send_frame(&ClientFrame::Leave {
            topic: topic.to_string(),
        })
        .await
    }

    async fn publish(&self, topic: &str, event: &TaskEvent) -> Result<(), ChannelError> {
        self.send_frame(&ClientFrame::Publish {
            topic: topic.to_string(),
            event: event.clone(),
        })
        .await
    }

    async fn next_event(&self) -> Result<(String, TaskEvent), ChannelError> {
        let mut rx = self.incoming.lock().await;
        rx.recv().await.ok_or(ChannelError::ConnectionClosed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Background task that reads hub frames and queues decoded events.
///
/// Malformed frames are logged and skipped — the reader does not
/// disconnect on bad data. Sets `connected` to `false` when the
/// WebSocket closes or errors out.
async fn reader_loop(
    mut reader: WsReader,
    tx: mpsc::Sender<(String, TaskEvent)>,
    connected: Arc<AtomicBool>,
) {
    while let Some(msg_result) = reader.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match hub::decode_server(&text) {
                Ok(ServerFrame::Event { topic, event }) => {
                    if tx.send((topic, event)).await.is_err() {
                        // Receiver dropped, the channel was dropped too.
                        break;
                    }
                }
                Ok(ServerFrame::Error { reason }) => {
                    tracing::warn!(reason = %reason, "hub reported error");
                }
                Ok(other) => {
                    tracing::debug!(?other, "unexpected hub frame");
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed hub frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("hub WebSocket closed by server");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => {}
            Err(e) => {
                tracing::warn!(err = %e, "hub WebSocket read error");
                break;
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
    tracing::info!("hub reader task exiting");
}
