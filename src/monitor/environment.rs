use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Whether the host surface (tab, window, app) is in the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// User activity the host can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Pointer,
    Key,
    Touch,
    Scroll,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [Self::Pointer, Self::Key, Self::Touch, Self::Scroll];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentEvent {
    Visibility(Visibility),
    Activity(ActivityKind),
}

/// Host-side handle for reporting visibility changes and user activity.
///
/// The client never inspects the host itself; whoever embeds it forwards
/// focus/visibility and input events through this handle.
#[derive(Debug, Clone)]
pub struct EnvironmentHandle {
    tx: mpsc::UnboundedSender<EnvironmentEvent>,
}

impl EnvironmentHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EnvironmentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.emit(EnvironmentEvent::Visibility(visibility));
    }

    pub fn activity(&self, kind: ActivityKind) {
        self.emit(EnvironmentEvent::Activity(kind));
    }

    fn emit(&self, event: EnvironmentEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Client stopped, dropping environment event {:?}", event);
        }
    }
}
