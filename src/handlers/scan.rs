use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::client::SocketClientOptions;
use crate::messaging::{Disposition, MessageHandler};
use crate::types::InboundMessage;

/// Scans are short; close the socket after two idle minutes
pub const SCAN_IDLE_TIMEOUT: u64 = 120_000;

pub fn scan_options(endpoint: impl Into<String>) -> SocketClientOptions {
    SocketClientOptions::new(endpoint)
        .with_idle_timeout(Some(SCAN_IDLE_TIMEOUT))
        .with_backoff(1000, 16_000)
        .with_close_code(4001, "Authentication failed, sign in again")
        .with_close_code(4003, "This account is banned from scanning")
        .with_close_code(4008, "Challenge verification failed, refresh to retry")
}

/// Progress report carried by `progress` and `complete` messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanProgress {
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScanProgress {
    pub fn from_update(update: &Value) -> Option<Self> {
        serde_json::from_value(update.clone()).ok()
    }
}

/// Starts a scan on open and follows it to completion
pub struct ScanHandler {
    request: Value,
}

impl ScanHandler {
    pub fn new() -> Self {
        Self {
            request: json!({ "action": "start_scan" }),
        }
    }

    /// Replaces the request sent on open, e.g. to add scan parameters
    pub fn with_request(mut self, request: Value) -> Self {
        self.request = request;
        self
    }
}

impl Default for ScanHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHandler for ScanHandler {
    fn on_open(&mut self) -> Vec<Value> {
        vec![self.request.clone()]
    }

    fn on_message(&mut self, message: &InboundMessage) -> Disposition {
        match message.action.as_str() {
            "progress" => Disposition::Update(message.body.clone()),
            "complete" | "completed" => Disposition::Finish(Some(message.body.clone())),
            "error" => Disposition::Fail(message.message().unwrap_or("Scan failed").to_string()),
            other => {
                tracing::debug!("Ignoring scan message '{}'", other);
                Disposition::Ignore
            }
        }
    }
}
