use serde_json::{Value, json};

use crate::client::SocketClientOptions;
use crate::messaging::{Disposition, MessageHandler};
use crate::types::InboundMessage;

pub const NOTIFICATION_IDLE_TIMEOUT: u64 = 300_000;
pub const NOTIFICATION_BACKOFF_CAP: u64 = 15_000;

pub fn notification_options(endpoint: impl Into<String>) -> SocketClientOptions {
    SocketClientOptions::new(endpoint)
        .with_idle_timeout(Some(NOTIFICATION_IDLE_TIMEOUT))
        .with_backoff(1000, NOTIFICATION_BACKOFF_CAP)
        .with_close_code(4001, "Session expired, sign in again")
}

/// Tracks the unread badge and surfaces incoming notifications.
///
/// Updates have the shape `{"unread": n}` plus `"notification"` when one
/// just arrived.
#[derive(Debug, Default)]
pub struct NotificationHandler {
    unread: u64,
}

impl NotificationHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageHandler for NotificationHandler {
    fn on_message(&mut self, message: &InboundMessage) -> Disposition {
        match message.action.as_str() {
            "notification" => {
                self.unread += 1;
                let notification = message
                    .field("notification")
                    .cloned()
                    .unwrap_or_else(|| message.body.clone());
                Disposition::Update(json!({
                    "unread": self.unread,
                    "notification": notification
                }))
            }
            "unread_count" => match message.field("count").and_then(Value::as_u64) {
                Some(count) => {
                    self.unread = count;
                    Disposition::Update(json!({ "unread": count }))
                }
                None => {
                    tracing::warn!("unread_count without a numeric count: {}", message.body);
                    Disposition::Ignore
                }
            },
            other => {
                tracing::debug!("Ignoring notification message '{}'", other);
                Disposition::Ignore
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> InboundMessage {
        InboundMessage::parse(text).unwrap()
    }

    #[test]
    fn test_notifications_bump_unread_count() {
        let mut handler = NotificationHandler::new();
        assert!(handler.on_open().is_empty());

        assert_eq!(
            handler.on_message(&message(r#"{"action":"unread_count","count":4}"#)),
            Disposition::Update(json!({ "unread": 4 }))
        );
        assert_eq!(
            handler.on_message(&message(
                r#"{"action":"notification","notification":{"id":9,"title":"New reply"}}"#
            )),
            Disposition::Update(json!({
                "unread": 5,
                "notification": { "id": 9, "title": "New reply" }
            }))
        );
    }

    #[test]
    fn test_bad_count_is_ignored() {
        let mut handler = NotificationHandler::new();
        assert_eq!(
            handler.on_message(&message(r#"{"action":"unread_count","count":"many"}"#)),
            Disposition::Ignore
        );
        assert_eq!(
            handler.on_message(&message(r#"{"action":"typing"}"#)),
            Disposition::Ignore
        );
    }

    #[test]
    fn test_preset() {
        let options = notification_options("wss://example.com/ws/notifications");
        assert_eq!(options.backoff_cap, 15_000);
        assert_eq!(options.idle_timeout, Some(300_000));
        assert!(options.close_codes.contains_key(&4001));
    }
}
