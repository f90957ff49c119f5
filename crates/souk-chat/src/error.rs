//! Chat feature error types.

use thiserror::Error;

/// Error type for chat sessions and polling.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Authorized HTTP failure (history fetch, unread counts)
    #[error("Auth error: {0}")]
    Auth(#[from] souk_auth::AuthError),

    /// Transport failure
    #[error("Socket error: {0}")]
    Socket(#[from] souk_realtime::SocketError),

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] souk_storage::StorageError),

    /// Server response did not match the expected contract
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using ChatError.
pub type ChatResult<T> = Result<T, ChatError>;
