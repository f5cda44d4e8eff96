// Messaging module - Event surface types and message routing
pub mod event;
pub mod router;

pub use event::{EventListener, SocketEvent};
pub use router::{Disposition, MessageHandler, MessageRouter, PassthroughHandler, Route};
