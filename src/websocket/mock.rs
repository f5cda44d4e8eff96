//! In-memory transport for driving the client from tests.

use tokio::sync::mpsc;

use super::transport::{CloseInfo, Connection, Connector, Outbound, TransportEvent};

/// Hands every opened connection to the test as a [`MockSocket`]
pub(crate) struct MockConnector {
    opened: mpsc::UnboundedSender<MockSocket>,
}

impl MockConnector {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<MockSocket>) {
        let (opened, sockets) = mpsc::unbounded_channel();
        (Self { opened }, sockets)
    }
}

impl Connector for MockConnector {
    fn open(&self, url: &str) -> Connection {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let socket = MockSocket {
            url: url.to_string(),
            events: events_tx,
            outbound: outbound_rx,
        };
        if self.opened.send(socket).is_err() {
            tracing::debug!("Test dropped its socket receiver");
        }

        Connection::new(outbound_tx, events_rx)
    }
}

/// The server side of one mock connection
pub(crate) struct MockSocket {
    pub(crate) url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
}

impl MockSocket {
    pub(crate) fn open(&self) {
        self.emit(TransportEvent::Opened);
    }

    pub(crate) fn text(&self, text: &str) {
        self.emit(TransportEvent::Text(text.to_string()));
    }

    pub(crate) fn error(&self, message: &str) {
        self.emit(TransportEvent::Error(message.to_string()));
    }

    pub(crate) fn close(&self, code: u16, reason: &str) {
        self.emit(TransportEvent::Closed(CloseInfo::new(code, reason)));
    }

    /// Waits for the next frame the client writes; `None` once the client
    /// dropped the connection.
    pub(crate) async fn next_outbound(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    pub(crate) fn try_outbound(&mut self) -> Option<Outbound> {
        self.outbound.try_recv().ok()
    }

    fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }
}
