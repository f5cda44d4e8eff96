// Module declarations
mod builder;
mod connection;
mod core;
mod state;

#[cfg(test)]
mod tests;

// Public API exports
pub use builder::{SocketClientBuilder, SocketClientOptions};
pub use connection::ConnectionStatus;
pub use self::core::SocketClient;
pub use state::{PendingTimers, Snapshot};
