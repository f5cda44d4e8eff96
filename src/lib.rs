//! # Resilient Socket
//!
//! A self-healing JSON-over-WebSocket client. It reconnects with capped
//! exponential backoff, sends heartbeats, closes the socket while the user is
//! idle or the host is hidden, and reopens it when they come back.
//!
//! ## Example
//!
//! ```no_run
//! use resilient_socket_rs::handlers::{NotificationHandler, notification_options};
//! use resilient_socket_rs::{SocketClient, SocketEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SocketClient::builder(notification_options("wss://example.com/ws/notifications"))?
//!         .handler(NotificationHandler::new())
//!         .on_event(|event| {
//!             if let SocketEvent::Update(update) = event {
//!                 println!("{update}");
//!             }
//!         })
//!         .build();
//!
//!     client.start(Some("session-token".to_string()))?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod handlers;
pub mod infrastructure;
pub mod messaging;
pub mod monitor;
pub mod types;
pub mod websocket;

pub use client::{
    ConnectionStatus, PendingTimers, Snapshot, SocketClient, SocketClientBuilder,
    SocketClientOptions,
};
pub use messaging::{Disposition, MessageHandler, SocketEvent};
pub use monitor::{ActivityKind, EnvironmentHandle, Visibility};
pub use types::{InboundMessage, Result, SocketError};
pub use websocket::{Connector, WebSocketConnector};
