use serde_json::Value;
use std::sync::Arc;

use crate::client::ConnectionStatus;

/// Notifications delivered to listeners registered on the client builder
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// Lifecycle status changed
    Status(ConnectionStatus),
    /// The message handler produced new state for the UI
    Update(Value),
    /// Something went wrong that the client recovers from on its own
    /// (malformed payload, transport error)
    Warning(String),
    /// Terminal failure; the client is now disabled until `start` is called
    Failed(String),
}

/// Listener callback, invoked on the client's task for every event
pub type EventListener = Arc<dyn Fn(&SocketEvent) + Send + Sync + 'static>;

