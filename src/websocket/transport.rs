use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::types::close_codes;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Close code and reason of a closing handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Normal closure (1000) with the given reason
    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(close_codes::NORMAL, reason)
    }

    /// Connection lost without a close frame (1006)
    pub fn abnormal() -> Self {
        Self::new(close_codes::ABNORMAL, "")
    }
}

/// Something that happened on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Text(String),
    Error(String),
    Closed(CloseInfo),
}

/// A frame the client wants on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close(CloseInfo),
}

/// One connection attempt.
///
/// Created in the CONNECTING state by a [`Connector`]; the transport reports
/// progress as [`TransportEvent`]s. A `Connection` is never reused: every
/// reconnect builds a new one. Dropping it tells the transport to shut down.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    opened: bool,
    last_sent: Option<Instant>,
}

impl Connection {
    pub fn new(
        outbound: mpsc::UnboundedSender<Outbound>,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            outbound,
            events,
            opened: false,
            last_sent: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this attempt ever reached OPEN
    pub fn opened(&self) -> bool {
        self.opened
    }

    pub fn mark_opened(&mut self) {
        self.opened = true;
    }

    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Queues a text frame. Returns `false` when the transport is gone.
    pub fn send_text(&mut self, text: String) -> bool {
        let sent = self.outbound.send(Outbound::Text(text)).is_ok();
        if sent {
            self.last_sent = Some(Instant::now());
        }
        sent
    }

    /// Starts the closing handshake
    pub fn close(&self, info: CloseInfo) {
        if self.outbound.send(Outbound::Close(info)).is_err() {
            tracing::debug!("Connection {} already shut down", self.id);
        }
    }

    /// Next transport event. A transport that went away without reporting a
    /// close is treated as an abnormal closure.
    pub async fn next_event(&mut self) -> TransportEvent {
        self.events
            .recv()
            .await
            .unwrap_or_else(|| TransportEvent::Closed(CloseInfo::abnormal()))
    }
}

/// Opens transport connections.
///
/// `open` must return immediately; the handshake result arrives later as
/// [`TransportEvent::Opened`] or [`TransportEvent::Closed`].
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str) -> Connection;
}
