//! Client-side storage for the Souk marketplace app.
//!
//! This crate provides:
//! - A `ClientStorage` trait over dumb key-value slots
//! - `FileStorage`: persistent JSON-document storage for tokens and the
//!   serialized user record
//! - `MemoryStorage`: ephemeral storage for session-scoped state (the MFA
//!   challenge) and for tests
//! - `CredentialStore`: the typed facade the rest of the client goes through

mod credentials;
mod file;
mod keys;
mod memory;
mod traits;

pub use credentials::{ApprovalStatus, CredentialStore, MfaChallenge, Role, UserRecord};
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::ClientStorage;

use souk_config::Paths;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend failure (file system, corrupt document)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create a `CredentialStore` backed by the default on-disk location,
/// with an in-memory slot for session-scoped state.
pub fn create_credential_store() -> StorageResult<CredentialStore> {
    let paths = Paths::new().map_err(|e| StorageError::Backend(e.to_string()))?;
    paths
        .ensure_base_dir()
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    let persistent = FileStorage::new(paths.credentials_file())?;
    Ok(CredentialStore::new(
        Box::new(persistent),
        Box::new(MemoryStorage::new()),
    ))
}
