use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::{InboundMessage, SocketError};

/// What a [`MessageHandler`] made of an inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// New state for the UI (progress, notification, snapshot...)
    Update(Value),
    /// Nothing to surface
    Ignore,
    /// The exchange is complete: deliver the optional final update, then
    /// close normally without reconnecting
    Finish(Option<Value>),
    /// Terminal protocol error, shown to the user and never retried
    Fail(String),
}

/// Protocol-specific half of a socket client.
///
/// Each concrete feed (scan progress, notifications, airdrops) supplies one.
/// Implementations must not panic; report problems through [`Disposition::Fail`].
pub trait MessageHandler: Send + 'static {
    /// Payloads to send right after the connection opens
    fn on_open(&mut self) -> Vec<Value> {
        Vec::new()
    }

    fn on_message(&mut self, message: &InboundMessage) -> Disposition;
}

/// Surfaces every message body as an update
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughHandler;

impl MessageHandler for PassthroughHandler {
    fn on_message(&mut self, message: &InboundMessage) -> Disposition {
        Disposition::Update(message.body.clone())
    }
}

/// Where an inbound message ended up
#[derive(Debug)]
pub enum Route {
    /// Reply to our heartbeat
    HeartbeatAck,
    /// Carried an error code from the known table
    Rejected(SocketError),
    Handled(Disposition),
}

/// Routes incoming messages to the appropriate handler
pub struct MessageRouter {
    handler: Box<dyn MessageHandler>,
    error_codes: BTreeMap<i64, String>,
    heartbeat_ack: Option<String>,
}

impl MessageRouter {
    pub fn new(
        handler: Box<dyn MessageHandler>,
        error_codes: BTreeMap<i64, String>,
        heartbeat_ack: Option<String>,
    ) -> Self {
        Self {
            handler,
            error_codes,
            heartbeat_ack,
        }
    }

    /// Payloads the handler wants sent on open
    pub fn opening_payloads(&mut self) -> Vec<Value> {
        self.handler.on_open()
    }

    /// Routes a message to the appropriate handler
    pub fn route(&mut self, message: &InboundMessage) -> Route {
        if let Some(code) = message.code
            && let Some(text) = self.error_codes.get(&code)
        {
            return Route::Rejected(SocketError::Rejected {
                code: Some(code),
                message: text.clone(),
            });
        }

        if self.is_heartbeat_ack(message) {
            return Route::HeartbeatAck;
        }

        Route::Handled(self.handler.on_message(message))
    }

    fn is_heartbeat_ack(&self, message: &InboundMessage) -> bool {
        self.heartbeat_ack.as_deref() == Some(message.action.as_str())
    }
}
