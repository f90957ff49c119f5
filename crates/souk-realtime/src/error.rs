//! Realtime transport error types.

use thiserror::Error;

/// Error type for socket operations.
#[derive(Error, Debug)]
pub enum SocketError {
    /// WebSocket connection failure
    #[error("Connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,

    /// Failed to hand a frame to the writer task
    #[error("Send error: {0}")]
    Send(String),

    /// Frame serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using SocketError.
pub type SocketResult<T> = Result<T, SocketError>;
