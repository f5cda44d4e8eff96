use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use super::transport::{CloseInfo, Connection, Connector, Outbound, TransportEvent};
use crate::infrastructure::Deadline;
use crate::types::{HANDSHAKE_TIMEOUT, close_codes, close_reasons};

/// How long to wait for the server's close reply before giving up
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens real WebSocket connections with tokio-tungstenite.
///
/// Each connection gets its own pump task that owns the socket, forwards
/// inbound frames as [`TransportEvent`]s and writes queued [`Outbound`] frames.
/// A handshake that does not finish within the timeout is reported like a
/// refused one.
#[derive(Debug, Clone, Copy)]
pub struct WebSocketConnector {
    handshake_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(HANDSHAKE_TIMEOUT),
        }
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, url: &str) -> Connection {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tracing::debug!("Creating WebSocket connection to: {}", url);
        tokio::spawn(pump(
            url.to_string(),
            self.handshake_timeout,
            events_tx,
            outbound_rx,
        ));
        Connection::new(outbound_tx, events_rx)
    }
}

async fn pump(
    url: String,
    handshake_timeout: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let handshake = match timeout(handshake_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("handshake timed out after {:?}", handshake_timeout)),
    };
    let ws_stream = match handshake {
        Ok(stream) => stream,
        Err(message) => {
            tracing::warn!("WebSocket handshake failed: {}", message);
            let _ = events.send(TransportEvent::Error(message));
            let _ = events.send(TransportEvent::Closed(CloseInfo::abnormal()));
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let _ = events.send(TransportEvent::Opened);

    let mut closing = false;
    let mut close_timeout = Deadline::new();

    loop {
        tokio::select! {
            frame = outbound.recv(), if !closing => {
                let message = match frame {
                    Some(Outbound::Text(text)) => Message::Text(text.into()),
                    Some(Outbound::Close(info)) => close_message(info),
                    None => close_message(CloseInfo::normal(close_reasons::TEARDOWN)),
                };
                if matches!(message, Message::Close(_)) {
                    closing = true;
                    close_timeout.arm(CLOSE_HANDSHAKE_TIMEOUT);
                }
                if let Err(e) = write.send(message).await {
                    tracing::warn!("WebSocket write error: {}", e);
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("Received text message: {}", text.as_str());
                    let _ = events.send(TransportEvent::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let info = match frame {
                        Some(frame) => CloseInfo::new(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseInfo::new(close_codes::NO_STATUS, ""),
                    };
                    tracing::info!(
                        "Connection closed: code={}, reason='{}'",
                        info.code,
                        info.reason
                    );
                    let _ = events.send(TransportEvent::Closed(info));
                    break;
                }
                Some(Ok(Message::Ping(data))) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                }
                Some(Ok(Message::Pong(data))) => {
                    tracing::debug!("Received pong ({} bytes)", data.len());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                }
                Some(Ok(Message::Frame(_))) => {
                    tracing::debug!("Received raw frame (internal)");
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    let _ = events.send(TransportEvent::Closed(CloseInfo::abnormal()));
                    break;
                }
                None => {
                    tracing::warn!("WebSocket stream ended without close frame");
                    let _ = events.send(TransportEvent::Closed(CloseInfo::abnormal()));
                    break;
                }
            },
            _ = close_timeout.fired() => {
                tracing::warn!("Server did not answer close handshake, dropping socket");
                let _ = events.send(TransportEvent::Closed(CloseInfo::abnormal()));
                break;
            }
        }
    }

    tracing::debug!("WebSocket pump finished");
}

fn close_message(info: CloseInfo) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::from(info.code),
        reason: info.reason.into(),
    }))
}
