//! Auth error types and user-facing classification.

use thiserror::Error;

/// Error type for authentication and authorized HTTP operations.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login rejected (wrong email/password)
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Vendor identity verified but business admission not granted
    #[error("Vendor account is awaiting approval")]
    VendorNotApproved,

    /// MFA code rejected by the server
    #[error("Invalid MFA code")]
    MfaCodeInvalid,

    /// Refresh failed or was impossible; the session has been cleared
    #[error("Session expired")]
    SessionExpired,

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] souk_storage::StorageError),

    /// Invalid session state machine transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Response arrived after a newer user action made it irrelevant
    #[error("Operation superseded by a newer action")]
    Superseded,

    /// Server response did not match the expected contract
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// User-facing error classes; screens render one message per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Credential,
    ApprovalPending,
    Mfa,
    SessionExpired,
    Network,
}

impl AuthError {
    /// Collapse the error into its user-facing class.
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::InvalidCredentials(_) => ErrorClass::Credential,
            AuthError::VendorNotApproved => ErrorClass::ApprovalPending,
            AuthError::MfaCodeInvalid => ErrorClass::Mfa,
            AuthError::SessionExpired => ErrorClass::SessionExpired,
            AuthError::Http(_)
            | AuthError::Storage(_)
            | AuthError::InvalidStateTransition(_)
            | AuthError::Superseded
            | AuthError::Protocol(_) => ErrorClass::Network,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
