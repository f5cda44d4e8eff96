use serde_json::Value;
use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::builder::SocketClientOptions;
use super::state::{ClientState, PendingTimers, Snapshot};
use crate::infrastructure::{Backoff, Deadline, HeartbeatManager};
use crate::messaging::{Disposition, MessageRouter, Route, SocketEvent};
use crate::monitor::{EnvironmentEvent, IdleAction, IdleMonitor};
use crate::types::{InboundMessage, SocketError, close_codes, close_reasons};
use crate::websocket::{CloseInfo, Connection, Connector, TransportEvent};

/// Lifecycle status of the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Enabled or never started, with no connection (idle closure, normal
    /// server close, deferred while hidden)
    #[default]
    Idle,
    Connecting,
    Open,
    /// Intentional close sent, waiting for the server to confirm
    Closing,
    /// Connection lost; a retry is armed
    ReconnectScheduled,
    /// Stopped, torn down or failed terminally; only `start` leaves this state
    Disabled,
}

/// Requests sent from `SocketClient` handles
#[derive(Debug)]
pub(crate) enum Command {
    Start { token: Option<String> },
    Stop,
    Send(Value),
    Shutdown,
}

/// Owns the socket lifecycle.
///
/// Everything runs on one task: commands, host environment events,
/// transport events, the heartbeat tick, the idle deadline and the reconnect
/// deadline are multiplexed in [`run`](ConnectionManager::run). Timers are
/// plain values owned here, so cancelling one is clearing it.
pub(crate) struct ConnectionManager {
    options: SocketClientOptions,
    connector: Arc<dyn Connector>,
    router: MessageRouter,
    state: ClientState,

    /// The CONNECTING or OPEN connection, if any
    connection: Option<Connection>,
    /// A connection we asked to close, kept until the server confirms
    closing: Option<Connection>,

    heartbeat: HeartbeatManager,
    idle: IdleMonitor,
    reconnect: Deadline,
    loss_backoff: Backoff,
    handshake_backoff: Backoff,
}

impl ConnectionManager {
    pub(crate) fn new(
        options: SocketClientOptions,
        connector: Arc<dyn Connector>,
        router: MessageRouter,
        state: ClientState,
    ) -> Self {
        let policy = options.backoff_policy();
        let heartbeat = HeartbeatManager::new(options.heartbeat_payload.clone())
            .with_interval(Duration::from_millis(options.heartbeat_interval));
        let idle = IdleMonitor::new(
            options.idle_timeout.map(Duration::from_millis),
            options.activity_events.clone(),
        );
        let handshake_backoff = Backoff::new(policy).with_limit(options.max_handshake_retries);

        Self {
            options,
            connector,
            router,
            state,
            connection: None,
            closing: None,
            heartbeat,
            idle,
            reconnect: Deadline::new(),
            loss_backoff: Backoff::new(policy),
            handshake_backoff,
        }
    }

    /// Drives the state machine until shutdown or until every client handle
    /// is dropped.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut environment: mpsc::UnboundedReceiver<EnvironmentEvent>,
    ) {
        tracing::debug!("Connection manager started for {}", self.options.endpoint);
        self.publish();

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Start { token }) => self.start(token),
                    Some(Command::Stop) => {
                        tracing::info!("Stop requested");
                        self.disable(close_reasons::STOPPED);
                    }
                    Some(Command::Send(payload)) => self.send(&payload),
                    Some(Command::Shutdown) | None => {
                        self.disable(close_reasons::TEARDOWN);
                        self.publish();
                        break;
                    }
                },
                Some(event) = environment.recv() => self.handle_environment(event),
                event = next_event(&mut self.connection) => self.on_transport_event(event),
                event = next_event(&mut self.closing) => self.on_closing_event(event),
                _ = self.heartbeat.tick() => self.send_heartbeat(),
                _ = self.idle.expired() => {
                    tracing::info!("No user activity, closing idle connection");
                    self.suspend(close_reasons::IDLE_TIMEOUT);
                }
                _ = self.reconnect.fired() => {
                    tracing::info!("Attempting to reconnect...");
                    self.connect();
                }
            }

            self.publish();
        }

        tracing::info!("Connection manager stopped");
    }

    fn start(&mut self, token: Option<String>) {
        if self.state.enabled && self.connection.is_some() {
            tracing::debug!("Already connected or connecting, ignoring start");
            return;
        }

        if !self.state.enabled {
            self.loss_backoff.reset();
            self.handshake_backoff.reset();
            self.state.last_update = None;
        }
        self.state.enabled = true;
        self.state.token = token;
        self.state.error = None;
        self.connect();
    }

    /// Opens a new connection unless one is already live
    fn connect(&mut self) {
        if self.connection.is_some() {
            tracing::debug!("Already connected or connecting");
            return;
        }
        if !self.state.enabled {
            return;
        }

        self.reconnect.clear();
        if !self.idle.is_visible() {
            tracing::debug!("Host hidden, deferring connect until visible");
            self.idle.defer();
            self.state.set_status(ConnectionStatus::Idle);
            return;
        }

        let url = match self.options.endpoint_url(self.state.token.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        self.closing = None;
        tracing::info!("Connecting to {}", self.options.endpoint);
        let connection = self.connector.open(&url);
        tracing::debug!("Created connection {}", connection.id());
        self.connection = Some(connection);
        self.state.set_status(ConnectionStatus::Connecting);
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Text(text) => self.on_text(&text),
            TransportEvent::Error(message) => {
                tracing::warn!("Transport error: {}", message);
                self.state.emit(SocketEvent::Warning(message));
            }
            TransportEvent::Closed(info) => self.on_close(info),
        }
    }

    fn on_open(&mut self) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        connection.mark_opened();

        self.loss_backoff.reset();
        self.handshake_backoff.reset();
        self.idle.opened();
        self.heartbeat.start();

        tracing::info!("Connected to {}", self.options.endpoint);
        self.state.set_status(ConnectionStatus::Open);

        for payload in self.router.opening_payloads() {
            self.send(&payload);
        }
    }

    fn on_text(&mut self, text: &str) {
        let inbound = match InboundMessage::parse(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!("Failed to parse message: {} - Raw: {}", e, text);
                self.state.emit(SocketEvent::Warning(e.to_string()));
                return;
            }
        };

        match self.router.route(&inbound) {
            Route::HeartbeatAck => {
                if let Some(sent) = self.connection.as_ref().and_then(Connection::last_sent) {
                    tracing::debug!("Heartbeat ack after {:?}", sent.elapsed());
                }
            }
            Route::Rejected(error) => self.fail(error),
            Route::Handled(Disposition::Update(value)) => self.update(value),
            Route::Handled(Disposition::Ignore) => {}
            Route::Handled(Disposition::Finish(value)) => {
                if let Some(value) = value {
                    self.update(value);
                }
                tracing::info!("Server finished the exchange");
                self.disable(close_reasons::FINISHED);
            }
            Route::Handled(Disposition::Fail(message)) => self.fail(SocketError::Rejected {
                code: inbound.code,
                message,
            }),
        }
    }

    fn on_close(&mut self, info: CloseInfo) {
        let opened = self
            .connection
            .take()
            .is_some_and(|connection| connection.opened());
        self.heartbeat.stop();
        self.idle.clear();

        tracing::info!(
            "Connection closed: code={}, reason='{}'",
            info.code,
            info.reason
        );

        if info.reason == close_reasons::IDLE_TIMEOUT {
            self.idle.defer();
            self.state.set_status(ConnectionStatus::Idle);
            return;
        }

        if let Some(message) = self.options.close_codes.get(&info.code) {
            self.fail(SocketError::Rejected {
                code: Some(i64::from(info.code)),
                message: message.clone(),
            });
            return;
        }

        if info.code == close_codes::ABNORMAL && !opened {
            match self.handshake_backoff.next_delay() {
                Some(delay) => {
                    tracing::warn!(
                        "Handshake rejected (attempt {}), retrying",
                        self.handshake_backoff.attempts()
                    );
                    self.schedule_reconnect(delay);
                }
                None => self.fail(SocketError::HandshakeExhausted {
                    attempts: self.handshake_backoff.attempts(),
                }),
            }
            return;
        }

        if matches!(info.code, close_codes::NORMAL | close_codes::GOING_AWAY) {
            self.state.set_status(ConnectionStatus::Idle);
            return;
        }

        if let Some(delay) = self.loss_backoff.next_delay() {
            tracing::warn!(
                "Connection lost unexpectedly (attempt {})",
                self.loss_backoff.attempts()
            );
            self.schedule_reconnect(delay);
        }
    }

    fn on_closing_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Closed(info) => {
                tracing::debug!("Close confirmed: code={}", info.code);
                self.closing = None;
                if self.connection.is_none() && self.state.status == ConnectionStatus::Closing {
                    self.state.set_status(ConnectionStatus::Idle);
                }
            }
            other => tracing::debug!("Ignoring {:?} on closing connection", other),
        }
    }

    fn handle_environment(&mut self, event: EnvironmentEvent) {
        let action = match event {
            EnvironmentEvent::Visibility(visibility) => {
                self.idle.on_visibility(visibility, self.state.enabled)
            }
            EnvironmentEvent::Activity(kind) => self.idle.on_activity(kind, self.state.enabled),
        };

        match action {
            IdleAction::Suspend => self.suspend(close_reasons::HIDDEN),
            IdleAction::Resume => {
                tracing::info!("User is back, reconnecting");
                self.connect();
            }
            IdleAction::None => {}
        }
    }

    /// Quiesces for the idle/visibility monitor: no reconnect is scheduled
    fn suspend(&mut self, reason: &str) {
        self.reconnect.clear();
        self.heartbeat.stop();

        match self.connection.take() {
            Some(connection) => {
                tracing::info!("Closing connection: {}", reason);
                connection.close(CloseInfo::normal(reason));
                self.closing = Some(connection);
                self.state.set_status(ConnectionStatus::Closing);
            }
            None if self.state.enabled => self.state.set_status(ConnectionStatus::Idle),
            None => {}
        }
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        tracing::info!("Reconnecting in {:?}", delay);
        self.reconnect.arm(delay);
        self.state.set_status(ConnectionStatus::ReconnectScheduled);
    }

    fn send_heartbeat(&mut self) {
        let payload = self.heartbeat.payload().clone();
        tracing::debug!("Sending heartbeat");
        self.send(&payload);
    }

    /// Sends when OPEN; otherwise the message is dropped
    fn send(&mut self, payload: &Value) {
        let Some(connection) = self
            .connection
            .as_mut()
            .filter(|connection| connection.opened())
        else {
            tracing::debug!("Not connected, dropping outbound message");
            return;
        };

        match serde_json::to_string(payload) {
            Ok(text) => {
                if !connection.send_text(text) {
                    tracing::debug!("Transport already gone, message dropped");
                }
            }
            Err(e) => tracing::error!("Failed to serialize outbound message: {}", e),
        }
    }

    fn update(&mut self, value: Value) {
        self.state.last_update = Some(value.clone());
        self.state.emit(SocketEvent::Update(value));
    }

    /// Cancels every timer and closes the connection with a normal code
    fn teardown(&mut self, reason: &str) {
        self.heartbeat.stop();
        self.idle.reset();
        self.reconnect.clear();
        self.state.enabled = false;

        if let Some(connection) = self.connection.take() {
            tracing::info!("Closing connection: {}", reason);
            connection.close(CloseInfo::normal(reason));
        }
        self.closing = None;
    }

    fn disable(&mut self, reason: &str) {
        self.teardown(reason);
        self.state.set_status(ConnectionStatus::Disabled);
    }

    /// Terminal failure: one `Failed` event, status Disabled, error recorded
    fn fail(&mut self, error: SocketError) {
        let message = error.to_string();
        tracing::error!("Connection failed: {}", message);

        self.teardown(close_reasons::FAILED);
        self.state.status = ConnectionStatus::Disabled;
        self.state.error = Some(message.clone());
        self.state.emit(SocketEvent::Failed(message));
    }

    fn publish(&self) {
        self.state.publish(Snapshot {
            status: self.state.status,
            last_update: self.state.last_update.clone(),
            error: self.state.error.clone(),
            attempt: self.loss_backoff.attempts(),
            handshake_failures: self.handshake_backoff.attempts(),
            suspended: self.idle.is_suspended(),
            timers: PendingTimers {
                heartbeat: self.heartbeat.is_running(),
                idle: self.idle.is_armed(),
                reconnect: self.reconnect.is_armed(),
            },
        });
    }
}

async fn next_event(slot: &mut Option<Connection>) -> TransportEvent {
    match slot.as_mut() {
        Some(connection) => connection.next_event().await,
        None => future::pending().await,
    }
}
