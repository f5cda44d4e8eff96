use super::connection::{Command, ConnectionManager};
use super::core::{ClientInner, SocketClient};
use super::state::{ClientState, Snapshot};
use crate::infrastructure::{BackoffPolicy, TaskManager};
use crate::messaging::{EventListener, MessageHandler, MessageRouter, PassthroughHandler, SocketEvent};
use crate::monitor::{ActivityKind, EnvironmentHandle};
use crate::types::{
    BACKOFF_BASE, BACKOFF_CAP, HANDSHAKE_TIMEOUT, HEARTBEAT_INTERVAL, IDLE_TIMEOUT, MAX_HANDSHAKE_RETRIES,
    PING_ACTION, PONG_ACTION, Result, SocketError, TOKEN_PARAM,
};
use crate::websocket::{Connector, WebSocketConnector};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use url::Url;

/// Configuration for one socket client.
///
/// All durations are in milliseconds. Missing fields fall back to
/// [`Default`] when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketClientOptions {
    /// `ws://` or `wss://` URL
    pub endpoint: String,
    /// Query parameter the `start` token is appended under
    pub token_param: String,
    pub heartbeat_interval: u64,
    pub heartbeat_payload: Value,
    /// Action of the server's heartbeat reply, kept away from the handler
    pub heartbeat_ack_action: Option<String>,
    /// `None` disables idle closing
    pub idle_timeout: Option<u64>,
    /// Activity that counts as the user being present
    pub activity_events: Vec<ActivityKind>,
    pub backoff_base: u64,
    pub backoff_cap: u64,
    pub backoff_jitter: bool,
    pub max_handshake_retries: u32,
    /// Limit on one WebSocket handshake
    pub handshake_timeout: u64,
    /// Close codes that end the session with a user-facing message
    pub close_codes: BTreeMap<u16, String>,
    /// In-message error codes that end the session with a user-facing message
    pub error_codes: BTreeMap<i64, String>,
}

impl Default for SocketClientOptions {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token_param: TOKEN_PARAM.to_string(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat_payload: json!({ "action": PING_ACTION }),
            heartbeat_ack_action: Some(PONG_ACTION.to_string()),
            idle_timeout: Some(IDLE_TIMEOUT),
            activity_events: ActivityKind::ALL.to_vec(),
            backoff_base: BACKOFF_BASE,
            backoff_cap: BACKOFF_CAP,
            backoff_jitter: false,
            max_handshake_retries: MAX_HANDSHAKE_RETRIES,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            close_codes: BTreeMap::new(),
            error_codes: BTreeMap::new(),
        }
    }
}

impl SocketClientOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Parses options from JSON, e.g. a config file section
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_heartbeat(mut self, interval_ms: u64, payload: Value) -> Self {
        self.heartbeat_interval = interval_ms;
        self.heartbeat_payload = payload;
        self
    }

    pub fn with_heartbeat_ack(mut self, action: Option<&str>) -> Self {
        self.heartbeat_ack_action = action.map(str::to_string);
        self
    }

    pub fn with_idle_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.idle_timeout = timeout_ms;
        self
    }

    pub fn with_activity_events(mut self, events: Vec<ActivityKind>) -> Self {
        self.activity_events = events;
        self
    }

    pub fn with_backoff(mut self, base_ms: u64, cap_ms: u64) -> Self {
        self.backoff_base = base_ms;
        self.backoff_cap = cap_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.backoff_jitter = jitter;
        self
    }

    pub fn with_max_handshake_retries(mut self, retries: u32) -> Self {
        self.max_handshake_retries = retries;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout_ms: u64) -> Self {
        self.handshake_timeout = timeout_ms;
        self
    }

    pub fn with_close_code(mut self, code: u16, message: impl Into<String>) -> Self {
        self.close_codes.insert(code, message.into());
        self
    }

    pub fn with_error_code(mut self, code: i64, message: impl Into<String>) -> Self {
        self.error_codes.insert(code, message.into());
        self
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_base),
            Duration::from_millis(self.backoff_cap),
        )
        .with_jitter(self.backoff_jitter)
    }

    /// Build the WebSocket endpoint URL with the optional token
    pub fn endpoint_url(&self, token: Option<&str>) -> Result<String> {
        let mut url = Url::parse(&self.endpoint)?;

        if let Some(token) = token {
            url.query_pairs_mut().append_pair(&self.token_param, token);
        }

        Ok(url.to_string())
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SocketError::Config(format!(
                "endpoint must use ws or wss, got {}",
                url.scheme()
            )));
        }
        if self.heartbeat_interval == 0 {
            return Err(SocketError::Config(
                "heartbeat_interval must be positive".to_string(),
            ));
        }
        if self.idle_timeout == Some(0) {
            return Err(SocketError::Config(
                "idle_timeout must be positive, use None to disable".to_string(),
            ));
        }
        if self.backoff_base == 0 || self.backoff_cap < self.backoff_base {
            return Err(SocketError::Config(format!(
                "invalid backoff: base {}ms, cap {}ms",
                self.backoff_base, self.backoff_cap
            )));
        }
        if self.handshake_timeout == 0 {
            return Err(SocketError::Config(
                "handshake_timeout must be positive".to_string(),
            ));
        }
        if self.token_param.is_empty() {
            return Err(SocketError::Config("token_param is required".to_string()));
        }
        Ok(())
    }
}

/// Builder for SocketClient that handles initialization
pub struct SocketClientBuilder {
    options: SocketClientOptions,
    connector: Arc<dyn Connector>,
    handler: Box<dyn MessageHandler>,
    listeners: Vec<EventListener>,
}

impl SocketClientBuilder {
    /// Create a new builder
    pub fn new(options: SocketClientOptions) -> Result<Self> {
        options.validate()?;
        let connector = WebSocketConnector::new()
            .with_handshake_timeout(Duration::from_millis(options.handshake_timeout));

        Ok(Self {
            options,
            connector: Arc::new(connector),
            handler: Box::new(PassthroughHandler),
            listeners: Vec::new(),
        })
    }

    /// Replaces the transport, e.g. with an in-memory one in tests
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn handler(mut self, handler: impl MessageHandler) -> Self {
        self.handler = Box::new(handler);
        self
    }

    /// Registers a listener, called on the client's task for every event
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Build the client and spawn its driver task
    pub fn build(self) -> SocketClient {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel::<Command>();
        let (environment, environment_rx) = EnvironmentHandle::channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

        let router = MessageRouter::new(
            self.handler,
            self.options.error_codes.clone(),
            self.options.heartbeat_ack_action.clone(),
        );
        let state = ClientState::new(self.listeners, snapshot_tx);
        let endpoint = self.options.endpoint.clone();
        let manager = ConnectionManager::new(self.options, self.connector, router, state);

        let mut tasks = TaskManager::new();
        tasks.spawn(manager.run(commands_rx, environment_rx));

        SocketClient {
            inner: Arc::new(ClientInner {
                endpoint,
                commands: commands_tx,
                environment,
                snapshot: snapshot_rx,
                tasks: Mutex::new(Some(tasks)),
            }),
        }
    }
}
