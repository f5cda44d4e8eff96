/// WebSocket close codes the client gives meaning to
pub mod close_codes {
    /// Normal closure, no reconnect
    pub const NORMAL: u16 = 1000;
    /// Endpoint going away, no reconnect
    pub const GOING_AWAY: u16 = 1001;
    /// Close frame without a status code
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close frame. Before the first open this
    /// means the server refused the upgrade.
    pub const ABNORMAL: u16 = 1006;
    /// Server hit an unexpected condition
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// Close reasons sent on intentional closes
pub mod close_reasons {
    pub const IDLE_TIMEOUT: &str = "idle-timeout";
    pub const HIDDEN: &str = "hidden";
    pub const STOPPED: &str = "stopped";
    pub const FINISHED: &str = "finished";
    pub const FAILED: &str = "failed";
    pub const TEARDOWN: &str = "teardown";
}

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 30_000;

/// Default idle timeout (milliseconds)
pub const IDLE_TIMEOUT: u64 = 300_000;

/// Default first reconnect delay (milliseconds)
pub const BACKOFF_BASE: u64 = 1000;

/// Default reconnect delay ceiling (milliseconds)
pub const BACKOFF_CAP: u64 = 16_000;

/// Default limit on the WebSocket handshake (milliseconds)
pub const HANDSHAKE_TIMEOUT: u64 = 10_000;

/// Rejected handshakes retried before giving up
pub const MAX_HANDSHAKE_RETRIES: u32 = 3;

/// Query parameter carrying the auth or challenge token
pub const TOKEN_PARAM: &str = "token";

/// Heartbeat payload action and the reply the server answers with
pub const PING_ACTION: &str = "ping";
pub const PONG_ACTION: &str = "pong";
