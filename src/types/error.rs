use thiserror::Error;

/// Errors that can occur when using the socket client.
#[derive(Error, Debug)]
pub enum SocketError {
    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Inbound frame was valid JSON but not a message the client understands
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The server kept refusing the WebSocket upgrade
    #[error("Could not connect after {attempts} attempts, refresh to retry")]
    HandshakeExhausted { attempts: u32 },

    /// The server ended the session with a user-facing message. `code` is
    /// the close or error code that triggered it, if the frame carried one.
    #[error("{message}")]
    Rejected { code: Option<i64>, message: String },

    /// Invalid client options
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// The client's background task has exited
    #[error("Client has shut down")]
    Shutdown,
}

/// Convenience type alias for `Result<T, SocketError>`.
pub type Result<T> = std::result::Result<T, SocketError>;
