use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::client::SocketClientOptions;
use crate::messaging::{Disposition, MessageHandler};
use crate::types::InboundMessage;

pub const AIRDROP_IDLE_TIMEOUT: u64 = 480_000;
pub const AIRDROP_CHANNEL: &str = "airdrops";

pub fn airdrop_options(endpoint: impl Into<String>) -> SocketClientOptions {
    SocketClientOptions::new(endpoint)
        .with_idle_timeout(Some(AIRDROP_IDLE_TIMEOUT))
        .with_backoff(1000, 16_000)
}

/// Keeps the set of active airdrops in sync with the tracker.
///
/// Every change produces an update of the form `{"airdrops": [...]}` with
/// the full current list, ordered by id.
#[derive(Debug, Default)]
pub struct AirdropHandler {
    active: BTreeMap<String, Value>,
}

impl AirdropHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, airdrop: &Value) -> bool {
        match airdrop_id(airdrop) {
            Some(id) => {
                self.active.insert(id, airdrop.clone());
                true
            }
            None => {
                tracing::warn!("Airdrop without an id: {}", airdrop);
                false
            }
        }
    }

    fn current(&self) -> Disposition {
        let airdrops: Vec<Value> = self.active.values().cloned().collect();
        Disposition::Update(json!({ "airdrops": airdrops }))
    }
}

impl MessageHandler for AirdropHandler {
    fn on_open(&mut self) -> Vec<Value> {
        // A fresh snapshot follows every subscribe
        self.active.clear();
        vec![json!({ "action": "subscribe", "channel": AIRDROP_CHANNEL })]
    }

    fn on_message(&mut self, message: &InboundMessage) -> Disposition {
        match message.action.as_str() {
            "airdrops" => {
                let Some(list) = message.field("airdrops").and_then(Value::as_array) else {
                    tracing::warn!("Airdrop snapshot without a list: {}", message.body);
                    return Disposition::Ignore;
                };
                self.active.clear();
                for airdrop in list {
                    self.insert(airdrop);
                }
                self.current()
            }
            "airdrop" => match message.field("airdrop") {
                Some(airdrop) if self.insert(airdrop) => self.current(),
                _ => Disposition::Ignore,
            },
            "airdrop_removed" => {
                let removed = message
                    .field("id")
                    .and_then(id_string)
                    .and_then(|id| self.active.remove(&id));
                match removed {
                    Some(_) => self.current(),
                    None => Disposition::Ignore,
                }
            }
            other => {
                tracing::debug!("Ignoring airdrop message '{}'", other);
                Disposition::Ignore
            }
        }
    }
}

fn airdrop_id(airdrop: &Value) -> Option<String> {
    airdrop.get("id").and_then(id_string)
}

fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
