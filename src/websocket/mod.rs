// WebSocket module - Transport seam and the tokio-tungstenite implementation
pub mod factory;
#[cfg(test)]
pub(crate) mod mock;
pub mod transport;

pub use factory::WebSocketConnector;
pub use transport::{CloseInfo, Connection, Connector, Outbound, TransportEvent};
