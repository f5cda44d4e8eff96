use serde_json::{Map, Value};

use crate::types::{Result, SocketError};

/// A parsed inbound frame.
///
/// The server sends JSON objects discriminated by an `action` field (older
/// endpoints use `type`). Error frames may carry a numeric `code` or
/// `error_code`.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub action: String,
    pub code: Option<i64>,
    pub body: Value,
}

impl InboundMessage {
    pub fn new(action: impl Into<String>, body: Value) -> Self {
        let code = body.as_object().and_then(error_code);
        Self {
            action: action.into(),
            code,
            body,
        }
    }

    /// Parses a text frame
    pub fn parse(text: &str) -> Result<Self> {
        let body: Value = serde_json::from_str(text)?;
        let object = body
            .as_object()
            .ok_or_else(|| SocketError::MalformedMessage("expected a JSON object".to_string()))?;

        let action = object
            .get("action")
            .or_else(|| object.get("type"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SocketError::MalformedMessage("missing `action` or `type` field".to_string())
            })?
            .to_string();

        let code = error_code(object);
        Ok(Self { action, code, body })
    }

    /// Looks up a top-level field of the body
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Human-readable message carried by the frame, if any
    pub fn message(&self) -> Option<&str> {
        self.field("message")
            .or_else(|| self.field("error"))
            .and_then(Value::as_str)
    }
}

fn error_code(object: &Map<String, Value>) -> Option<i64> {
    object
        .get("code")
        .or_else(|| object.get("error_code"))
        .and_then(Value::as_i64)
}
