use super::connection::ConnectionStatus;
use crate::messaging::{EventListener, SocketEvent};
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::sync::watch;

/// Which timers are currently armed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingTimers {
    pub heartbeat: bool,
    pub idle: bool,
    pub reconnect: bool,
}

impl PendingTimers {
    pub fn any(&self) -> bool {
        self.heartbeat || self.idle || self.reconnect
    }
}

/// Read model of the client, published after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub status: ConnectionStatus,
    /// Most recent update produced by the message handler
    pub last_update: Option<Value>,
    /// Terminal error, cleared by the next `start`
    pub error: Option<String>,
    /// Consecutive unexpected losses since the last successful open
    pub attempt: u32,
    /// Rejected handshakes since the last successful open
    pub handshake_failures: u32,
    /// Closed by the idle/visibility monitor, waiting for the user to return
    pub suspended: bool,
    pub timers: PendingTimers,
}

/// Consolidated mutable state for the connection manager
pub(crate) struct ClientState {
    pub status: ConnectionStatus,

    /// Whether the owner wants a connection (set by `start`, cleared by
    /// `stop`, teardown and terminal errors)
    pub enabled: bool,

    /// Auth or challenge token passed to the last `start`
    pub token: Option<String>,

    pub last_update: Option<Value>,
    pub error: Option<String>,

    listeners: Vec<EventListener>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl ClientState {
    pub fn new(listeners: Vec<EventListener>, snapshot_tx: watch::Sender<Snapshot>) -> Self {
        Self {
            status: ConnectionStatus::Idle,
            enabled: false,
            token: None,
            last_update: None,
            error: None,
            listeners,
            snapshot_tx,
        }
    }

    /// Moves to `status`, notifying listeners if it changed
    pub fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        tracing::debug!("Status {:?} -> {:?}", self.status, status);
        self.status = status;
        self.emit(SocketEvent::Status(status));
    }

    /// Delivers an event to every listener, on the caller's tick
    pub fn emit(&self, event: SocketEvent) {
        for listener in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::error!("Event listener panicked while handling {:?}", event);
            }
        }
    }

    /// Publishes a snapshot to watchers if anything changed
    pub fn publish(&self, snapshot: Snapshot) {
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_state() -> (ClientState, Arc<Mutex<Vec<SocketEvent>>>, watch::Receiver<Snapshot>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let listener: EventListener = Arc::new(move |event: &SocketEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        let (tx, rx) = watch::channel(Snapshot::default());
        (ClientState::new(vec![listener], tx), events, rx)
    }

    #[test]
    fn test_set_status_emits_only_on_change() {
        let (mut state, events, _rx) = recording_state();
        state.set_status(ConnectionStatus::Connecting);
        state.set_status(ConnectionStatus::Connecting);
        state.set_status(ConnectionStatus::Open);

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SocketEvent::Status(ConnectionStatus::Connecting),
                SocketEvent::Status(ConnectionStatus::Open),
            ]
        );
    }

    fn panicking_listener(_: &SocketEvent) {
        panic!("listener bug");
    }

    #[test]
    fn test_panicking_listener_does_not_stop_others() {
        let (tx, _rx) = watch::channel(Snapshot::default());
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let state = ClientState::new(
            vec![
                Arc::new(panicking_listener) as EventListener,
                Arc::new(move |_: &SocketEvent| *counter.lock().unwrap() += 1) as EventListener,
            ],
            tx,
        );

        state.emit(SocketEvent::Warning("bad frame".to_string()));
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_publish_skips_identical_snapshots() {
        let (state, _events, mut rx) = recording_state();

        state.publish(Snapshot::default());
        assert!(!rx.has_changed().unwrap());

        state.publish(Snapshot {
            status: ConnectionStatus::Open,
            ..Default::default()
        });
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, ConnectionStatus::Open);
    }

    #[test]
    fn test_pending_timers_any() {
        assert!(!PendingTimers::default().any());
        assert!(
            PendingTimers {
                reconnect: true,
                ..Default::default()
            }
            .any()
        );
    }
}
