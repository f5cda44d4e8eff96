use super::*;
use crate::handlers::ScanHandler;
use crate::messaging::{MessageHandler, PassthroughHandler, SocketEvent};
use crate::monitor::{ActivityKind, Visibility};
use crate::types::SocketError;
use crate::websocket::{CloseInfo, Outbound};
use crate::websocket::mock::{MockConnector, MockSocket};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

const ENDPOINT: &str = "ws://localhost:9000/ws";

struct Harness {
    client: SocketClient,
    sockets: mpsc::UnboundedReceiver<MockSocket>,
    events: Arc<Mutex<Vec<SocketEvent>>>,
}

impl Harness {
    fn new(options: SocketClientOptions) -> Self {
        Self::with_handler(options, PassthroughHandler)
    }

    fn with_handler(options: SocketClientOptions, handler: impl MessageHandler) -> Self {
        let (connector, sockets) = MockConnector::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let client = SocketClient::builder(options)
            .unwrap()
            .connector(connector)
            .handler(handler)
            .on_event(move |event| sink.lock().unwrap().push(event.clone()))
            .build();

        Self {
            client,
            sockets,
            events,
        }
    }

    async fn next_socket(&mut self) -> MockSocket {
        self.sockets.recv().await.expect("connector dropped")
    }

    /// Starts the client and completes the handshake
    async fn open(&mut self) -> MockSocket {
        self.client.start(None).unwrap();
        let socket = self.next_socket().await;
        socket.open();
        self.wait_for(ConnectionStatus::Open).await;
        socket
    }

    async fn wait_for(&self, status: ConnectionStatus) {
        let mut rx = self.client.watch();
        rx.wait_for(|snapshot| snapshot.status == status)
            .await
            .expect("client task exited");
    }

    fn events(&self) -> Vec<SocketEvent> {
        self.events.lock().unwrap().clone()
    }

    fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SocketEvent::Failed(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

fn options() -> SocketClientOptions {
    SocketClientOptions::new(ENDPOINT)
}

fn ping() -> Outbound {
    Outbound::Text(json!({ "action": "ping" }).to_string())
}

fn close(reason: &str) -> Outbound {
    Outbound::Close(CloseInfo::normal(reason))
}

#[track_caller]
fn assert_elapsed(since: Instant, expected: Duration) {
    let elapsed = since.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "expected ~{expected:?}, got {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_appends_token_to_url() {
    let mut harness = Harness::new(options());
    harness.client.start(Some("abc123".to_string())).unwrap();

    let socket = harness.next_socket().await;
    assert_eq!(socket.url, "ws://localhost:9000/ws?token=abc123");
    harness.wait_for(ConnectionStatus::Connecting).await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent() {
    let mut harness = Harness::new(options());
    harness.client.start(None).unwrap();
    harness.client.start(None).unwrap();
    let socket = harness.next_socket().await;
    sleep(Duration::from_millis(10)).await;
    assert!(harness.sockets.try_recv().is_err());

    socket.open();
    harness.wait_for(ConnectionStatus::Open).await;
    harness.client.start(Some("other".to_string())).unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(harness.sockets.try_recv().is_err());
    assert_eq!(harness.client.status(), ConnectionStatus::Open);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_hidden_then_visible_reconnects() {
    let mut harness = Harness::new(options());
    let mut socket = harness.open().await;
    let opened_at = Instant::now();

    assert_eq!(socket.next_outbound().await, Some(ping()));
    assert_elapsed(opened_at, Duration::from_secs(30));

    harness.client.environment().set_visibility(Visibility::Hidden);
    assert_eq!(socket.next_outbound().await, Some(close("hidden")));
    harness.wait_for(ConnectionStatus::Closing).await;

    let snapshot = harness.client.snapshot();
    assert!(snapshot.suspended);
    assert!(!snapshot.timers.any());

    socket.close(1000, "hidden");
    harness.wait_for(ConnectionStatus::Idle).await;

    // Nothing happens while hidden
    sleep(Duration::from_secs(600)).await;
    assert!(harness.sockets.try_recv().is_err());

    harness.client.environment().set_visibility(Visibility::Visible);
    let _fresh = harness.next_socket().await;
    harness.wait_for(ConnectionStatus::Connecting).await;
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_close_reconnects_after_first_delay() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;

    socket.close(1011, "internal error");
    harness.wait_for(ConnectionStatus::ReconnectScheduled).await;
    let snapshot = harness.client.snapshot();
    assert_eq!(snapshot.attempt, 1);
    assert!(snapshot.timers.reconnect);
    assert!(!snapshot.timers.heartbeat);

    let closed_at = Instant::now();
    let _second = harness.next_socket().await;
    assert_elapsed(closed_at, Duration::from_secs(1));
    assert!(harness.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_backoff_resets_after_successful_open() {
    let mut harness = Harness::new(options());
    let first = harness.open().await;

    first.close(1011, "");
    let second = harness.next_socket().await;
    second.close(1011, "");
    harness.wait_for(ConnectionStatus::ReconnectScheduled).await;
    assert_eq!(harness.client.snapshot().attempt, 2);

    let third = harness.next_socket().await;
    third.open();
    harness.wait_for(ConnectionStatus::Open).await;
    assert_eq!(harness.client.snapshot().attempt, 0);

    third.close(1011, "");
    harness.wait_for(ConnectionStatus::ReconnectScheduled).await;
    assert_eq!(harness.client.snapshot().attempt, 1);

    let closed_at = Instant::now();
    let _fourth = harness.next_socket().await;
    assert_elapsed(closed_at, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_closes_without_reconnect() {
    let mut harness = Harness::new(options().with_idle_timeout(Some(45_000)));
    let mut socket = harness.open().await;

    assert_eq!(socket.next_outbound().await, Some(ping()));
    assert_eq!(socket.next_outbound().await, Some(close("idle-timeout")));
    harness.wait_for(ConnectionStatus::Closing).await;

    socket.close(1000, "idle-timeout");
    harness.wait_for(ConnectionStatus::Idle).await;

    sleep(Duration::from_secs(3600)).await;
    assert!(harness.sockets.try_recv().is_err());
    let snapshot = harness.client.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Idle);
    assert!(snapshot.suspended);
    assert!(!snapshot.timers.any());
}

#[tokio::test(start_paused = true)]
async fn test_server_idle_close_is_not_retried() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;

    socket.close(4000, "idle-timeout");
    harness.wait_for(ConnectionStatus::Idle).await;

    sleep(Duration::from_secs(3600)).await;
    assert!(harness.sockets.try_recv().is_err());
    assert!(!harness.client.snapshot().timers.reconnect);
}

#[tokio::test(start_paused = true)]
async fn test_activity_after_idle_close_resumes() {
    let mut harness = Harness::new(options().with_idle_timeout(Some(10_000)));
    let mut socket = harness.open().await;

    assert_eq!(socket.next_outbound().await, Some(close("idle-timeout")));
    socket.close(1000, "idle-timeout");
    harness.wait_for(ConnectionStatus::Idle).await;

    harness.client.environment().activity(ActivityKind::Pointer);
    let resumed = harness.next_socket().await;
    resumed.open();
    harness.wait_for(ConnectionStatus::Open).await;

    let snapshot = harness.client.snapshot();
    assert!(!snapshot.suspended);
    assert!(snapshot.timers.idle);
}

#[tokio::test(start_paused = true)]
async fn test_activity_postpones_idle_close() {
    let mut harness = Harness::new(
        options()
            .with_idle_timeout(Some(10_000))
            .with_activity_events(vec![ActivityKind::Key]),
    );
    let mut socket = harness.open().await;
    let opened_at = Instant::now();

    sleep(Duration::from_secs(8)).await;
    harness.client.environment().activity(ActivityKind::Key);
    // Not a qualifying activity
    harness.client.environment().activity(ActivityKind::Scroll);

    assert_eq!(socket.next_outbound().await, Some(close("idle-timeout")));
    assert_elapsed(opened_at, Duration::from_secs(18));
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_everything() {
    let mut harness = Harness::new(options());
    let mut socket = harness.open().await;

    harness.client.stop().unwrap();
    assert_eq!(socket.next_outbound().await, Some(close("stopped")));
    assert_eq!(socket.next_outbound().await, None);
    harness.wait_for(ConnectionStatus::Disabled).await;
    assert!(!harness.client.snapshot().timers.any());

    let seen = harness.events().len();
    sleep(Duration::from_secs(3600)).await;

    assert_eq!(harness.events().len(), seen);
    assert!(harness.sockets.try_recv().is_err());
    assert_eq!(harness.client.status(), ConnectionStatus::Disabled);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_reconnect() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;

    socket.close(1006, "");
    harness.wait_for(ConnectionStatus::ReconnectScheduled).await;
    harness.client.stop().unwrap();
    harness.wait_for(ConnectionStatus::Disabled).await;

    sleep(Duration::from_secs(3600)).await;
    assert!(harness.sockets.try_recv().is_err());
    assert!(!harness.client.snapshot().timers.any());
}

#[tokio::test(start_paused = true)]
async fn test_handshake_retries_are_bounded() {
    let mut harness = Harness::new(options());
    harness.client.start(None).unwrap();

    let mut sockets = Vec::new();
    for delay in [0, 1, 2, 4] {
        let rejected_at = Instant::now();
        let socket = harness.next_socket().await;
        assert_elapsed(rejected_at, Duration::from_secs(delay));
        socket.close(1006, "");
        sockets.push(socket);
    }

    harness.wait_for(ConnectionStatus::Disabled).await;

    sleep(Duration::from_secs(3600)).await;
    assert!(harness.sockets.try_recv().is_err());

    let expected = "Could not connect after 4 attempts, refresh to retry";
    assert_eq!(harness.failures(), vec![expected.to_string()]);
    assert_eq!(harness.client.error().as_deref(), Some(expected));
    assert!(!harness.client.snapshot().timers.any());
}

#[tokio::test(start_paused = true)]
async fn test_start_after_failure_clears_error() {
    let mut harness = Harness::new(options().with_max_handshake_retries(0));
    harness.client.start(None).unwrap();
    let rejected = harness.next_socket().await;
    rejected.close(1006, "");
    harness.wait_for(ConnectionStatus::Disabled).await;
    assert!(harness.client.error().is_some());

    let _socket = harness.open().await;
    let snapshot = harness.client.snapshot();
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.handshake_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_domain_close_code_is_terminal() {
    let mut harness = Harness::new(options().with_close_code(4003, "Account banned"));
    let socket = harness.open().await;

    socket.close(4003, "banned");
    harness.wait_for(ConnectionStatus::Disabled).await;

    assert_eq!(harness.client.error().as_deref(), Some("Account banned"));
    assert_eq!(harness.failures(), vec!["Account banned".to_string()]);
    sleep(Duration::from_secs(3600)).await;
    assert!(harness.sockets.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_error_code_in_message_is_terminal() {
    let mut harness = Harness::new(options().with_error_code(4001, "Session expired"));
    let mut socket = harness.open().await;

    socket.text(r#"{"action":"error","code":4001}"#);
    assert_eq!(socket.next_outbound().await, Some(close("failed")));
    harness.wait_for(ConnectionStatus::Disabled).await;

    assert_eq!(harness.client.error().as_deref(), Some("Session expired"));
    assert_eq!(harness.failures().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_finished_scan_delivers_result_then_disables() {
    let mut harness = Harness::with_handler(options(), ScanHandler::new());
    let mut socket = harness.open().await;
    assert_eq!(
        socket.next_outbound().await,
        Some(Outbound::Text(r#"{"action":"start_scan"}"#.to_string()))
    );

    socket.text(r#"{"action":"complete","percent":100}"#);
    assert_eq!(socket.next_outbound().await, Some(close("finished")));
    assert_eq!(socket.next_outbound().await, None);
    harness.wait_for(ConnectionStatus::Disabled).await;

    let result = json!({ "action": "complete", "percent": 100 });
    assert_eq!(harness.client.last_update(), Some(result.clone()));
    assert_eq!(harness.client.error(), None);
    assert!(harness.failures().is_empty());
    assert!(harness.events().ends_with(&[
        SocketEvent::Update(result),
        SocketEvent::Status(ConnectionStatus::Disabled),
    ]));

    sleep(Duration::from_secs(3600)).await;
    assert!(harness.sockets.try_recv().is_err());

    // A new scan starts from a blank result
    let _socket = harness.open().await;
    assert_eq!(harness.client.snapshot().last_update, None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_scan_reports_server_message() {
    let mut harness = Harness::with_handler(options(), ScanHandler::new());
    let mut socket = harness.open().await;
    assert!(socket.next_outbound().await.is_some());

    socket.text(r#"{"action":"progress","percent":40}"#);
    socket.text(r#"{"action":"error","message":"Profile is private"}"#);
    assert_eq!(socket.next_outbound().await, Some(close("failed")));
    harness.wait_for(ConnectionStatus::Disabled).await;

    assert_eq!(harness.client.error().as_deref(), Some("Profile is private"));
    assert_eq!(harness.failures(), vec!["Profile is private".to_string()]);
    assert!(harness.client.last_update().is_some());

    let _socket = harness.open().await;
    let snapshot = harness.client.snapshot();
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.last_update, None);
}

#[tokio::test(start_paused = true)]
async fn test_normal_server_close_goes_idle() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;

    socket.close(1001, "going away");
    harness.wait_for(ConnectionStatus::Idle).await;

    sleep(Duration::from_secs(3600)).await;
    assert!(harness.sockets.try_recv().is_err());
    assert!(harness.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_is_not_terminal() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;

    socket.text("not json");
    socket.text(r#"{"no_action":true}"#);
    socket.text(r#"{"action":"pong"}"#);
    socket.text(r#"{"action":"progress","percent":40}"#);

    let mut rx = harness.client.watch();
    rx.wait_for(|snapshot| snapshot.last_update.is_some())
        .await
        .unwrap();

    let events = harness.events();
    let warnings = events
        .iter()
        .filter(|event| matches!(event, SocketEvent::Warning(_)))
        .count();
    let updates: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, SocketEvent::Update(_)))
        .collect();
    assert_eq!(warnings, 2);
    assert_eq!(
        updates,
        vec![&SocketEvent::Update(
            json!({ "action": "progress", "percent": 40 })
        )]
    );
    assert_eq!(harness.client.status(), ConnectionStatus::Open);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_is_a_warning() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;

    socket.error("connection reset");
    socket.close(1006, "");
    harness.wait_for(ConnectionStatus::ReconnectScheduled).await;

    assert!(
        harness
            .events()
            .contains(&SocketEvent::Warning("connection reset".to_string()))
    );
    assert!(harness.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_send_is_refused_while_not_open() {
    let mut harness = Harness::new(options());
    assert!(matches!(
        harness.client.send(json!({ "action": "hello" })),
        Err(SocketError::NotConnected)
    ));

    let mut socket = harness.open().await;
    harness.client.send(json!({ "action": "hello" })).unwrap();
    assert_eq!(
        socket.next_outbound().await,
        Some(Outbound::Text(r#"{"action":"hello"}"#.to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropping_client_closes_connection() {
    let mut harness = Harness::new(options());
    let mut socket = harness.open().await;

    drop(harness.client);
    assert_eq!(socket.next_outbound().await, Some(close("teardown")));
    assert_eq!(socket.next_outbound().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_driver() {
    let mut harness = Harness::new(options());
    let mut socket = harness.open().await;

    harness.client.shutdown().await;
    assert_eq!(harness.client.status(), ConnectionStatus::Disabled);
    assert_eq!(socket.try_outbound(), Some(close("teardown")));
    assert!(matches!(
        harness.client.start(None),
        Err(SocketError::Shutdown)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_while_hidden_waits_for_visibility() {
    let mut harness = Harness::new(options());
    harness.client.environment().set_visibility(Visibility::Hidden);
    sleep(Duration::from_millis(10)).await;
    harness.client.start(None).unwrap();

    sleep(Duration::from_secs(60)).await;
    assert!(harness.sockets.try_recv().is_err());
    assert_eq!(harness.client.status(), ConnectionStatus::Idle);
    assert!(harness.client.snapshot().suspended);

    harness.client.environment().set_visibility(Visibility::Visible);
    let _socket = harness.next_socket().await;
}

#[tokio::test(start_paused = true)]
async fn test_hidden_cancels_pending_reconnect() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;

    socket.close(1011, "");
    harness.wait_for(ConnectionStatus::ReconnectScheduled).await;
    harness.client.environment().set_visibility(Visibility::Hidden);
    harness.wait_for(ConnectionStatus::Idle).await;

    sleep(Duration::from_secs(60)).await;
    assert!(harness.sockets.try_recv().is_err());
}

fn panicking_listener(event: &SocketEvent) {
    if matches!(event, SocketEvent::Update(_)) {
        panic!("listener bug");
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_listener_does_not_break_driver() {
    let (connector, mut sockets) = MockConnector::new();
    let client = SocketClient::builder(options())
        .unwrap()
        .connector(connector)
        .on_event(panicking_listener)
        .build();

    client.start(None).unwrap();
    let socket = sockets.recv().await.unwrap();
    socket.open();
    socket.text(r#"{"action":"progress"}"#);
    socket.text(r#"{"action":"progress","done":true}"#);

    let mut rx = client.watch();
    rx.wait_for(|snapshot| {
        snapshot.last_update == Some(json!({ "action": "progress", "done": true }))
    })
    .await
    .unwrap();
    assert_eq!(client.status(), ConnectionStatus::Open);
}

#[tokio::test(start_paused = true)]
async fn test_status_events_follow_lifecycle() {
    let mut harness = Harness::new(options());
    let socket = harness.open().await;
    socket.close(1000, "");
    harness.wait_for(ConnectionStatus::Idle).await;

    let statuses: Vec<_> = harness
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SocketEvent::Status(status) => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Open,
            ConnectionStatus::Idle,
        ]
    );
}
