//! Identity layer: token storage, transparent refresh, the session state
//! machine and MFA flows.
//!
//! The entry points are [`ApiClient`] for authorized HTTP and
//! [`SessionManager`] for the login/MFA/logout lifecycle. Both sit on top
//! of the [`souk_storage::CredentialStore`], which is the single source of
//! truth for tokens and the user record.

pub mod api;
pub mod error;
pub mod manager;
pub mod session_fsm;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::ApiClient;
pub use error::{AuthError, AuthResult, ErrorClass};
pub use manager::SessionManager;
pub use session_fsm::{SessionInput, SessionMachine, SessionMachineState, SessionState};
pub use types::{LoginOutcome, SessionSnapshot};

// Persisted record types live with the storage layer; re-exported here so
// downstream crates only import souk-auth.
pub use souk_storage::{ApprovalStatus, MfaChallenge, Role, UserRecord};
