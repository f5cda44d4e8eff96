use super::connection::{Command, ConnectionStatus};
use super::state::Snapshot;
use super::{SocketClientBuilder, SocketClientOptions};
use crate::infrastructure::TaskManager;
use crate::monitor::EnvironmentHandle;
use crate::types::{Result, SocketError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};

/// Handle to a resilient WebSocket connection.
///
/// `SocketClient` is cheap to clone; all clones drive the same connection.
/// The connection itself lives on a background task that reconnects with
/// exponential backoff, sends heartbeats, and closes the socket while the
/// user is idle or the host is hidden. Dropping the last clone tears the
/// connection down.
///
/// # Example
///
/// ```no_run
/// use resilient_socket_rs::{SocketClient, SocketClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SocketClient::new(SocketClientOptions::new("wss://example.com/ws/notifications"))?;
///
/// client.start(Some("session-token".to_string()))?;
/// // Use the client...
/// client.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SocketClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) endpoint: String,
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) environment: EnvironmentHandle,
    pub(crate) snapshot: watch::Receiver<Snapshot>,
    pub(crate) tasks: Mutex<Option<TaskManager>>,
}

impl SocketClient {
    /// Starts building a client with a custom handler, connector or listeners
    pub fn builder(options: SocketClientOptions) -> Result<SocketClientBuilder> {
        SocketClientBuilder::new(options)
    }

    /// Creates a client that surfaces every message body as an update.
    ///
    /// Must be called from within a tokio runtime. The client does not
    /// connect until [`start()`](Self::start) is called.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::Config`] or [`SocketError::UrlParse`] if the
    /// options are invalid.
    pub fn new(options: SocketClientOptions) -> Result<Self> {
        SocketClientBuilder::new(options).map(|builder| builder.build())
    }

    /// Enables the client and connects, appending `token` to the endpoint
    /// URL if given.
    ///
    /// Calling this while already connecting or connected is a no-op. After
    /// a terminal error it clears the error and starts over. While the host
    /// is hidden the connection is deferred until it becomes visible.
    pub fn start(&self, token: Option<String>) -> Result<()> {
        self.command(Command::Start { token })
    }

    /// Closes the connection and cancels every pending timer. Nothing
    /// reconnects until the next [`start()`](Self::start).
    pub fn stop(&self) -> Result<()> {
        self.command(Command::Stop)
    }

    /// Sends a JSON message over the open connection.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::NotConnected`] unless the connection is open.
    /// Messages are never queued for later delivery.
    pub fn send(&self, payload: Value) -> Result<()> {
        if !self.is_connected() {
            return Err(SocketError::NotConnected);
        }
        self.command(Command::Send(payload))
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.snapshot.borrow().status
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Most recent update produced by the message handler
    pub fn last_update(&self) -> Option<Value> {
        self.inner.snapshot.borrow().last_update.clone()
    }

    /// Terminal error, if the client gave up
    pub fn error(&self) -> Option<String> {
        self.inner.snapshot.borrow().error.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Open
    }

    /// Subscribes to snapshot changes
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.clone()
    }

    /// Handle the host uses to report visibility and user activity
    pub fn environment(&self) -> EnvironmentHandle {
        self.inner.environment.clone()
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Disables the client and waits for its background task to exit.
    ///
    /// Every clone stops working afterwards; commands return
    /// [`SocketError::Shutdown`].
    pub async fn shutdown(&self) {
        if self.inner.commands.send(Command::Shutdown).is_err() {
            tracing::debug!("Client already shut down");
        }

        let tasks = self.inner.tasks.lock().await.take();
        if let Some(tasks) = tasks {
            tasks.join_all().await;
            tracing::info!("Client for {} shut down", self.inner.endpoint);
        }
    }

    fn command(&self, command: Command) -> Result<()> {
        self.inner
            .commands
            .send(command)
            .map_err(|_| SocketError::Shutdown)
    }
}
