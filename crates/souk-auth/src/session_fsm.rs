//! Session state machine using rust-fsm.
//!
//! An explicit finite state machine for the login/MFA/session lifecycle,
//! so the flow is driven by named transitions rather than flags scattered
//! over the UI layer.
//!
//! ## State Diagram
//!
//! ```text
//! ┌───────────────┐
//! │ Uninitialized │ (initial)
//! └───────┬───────┘
//!         │ ResolvedAnonymous / ResolvedAuthenticated
//!         ▼
//! ┌───────────────┐  LoginSubmitted   ┌────────────────┐
//! │   Anonymous   │ ────────────────► │ Authenticating │
//! └───────────────┘                   └───────┬────────┘
//!         ▲                                   │
//!         │ LoginFailed / MfaRestart          │ MfaSetupRequired ──► MfaSetup
//!         │ LoggedOut / SessionInvalidated    │ MfaVerifyRequired ─► MfaVerify
//!         │                                   │ LoginSucceeded
//!         │                                   ▼
//!         │                           ┌───────────────┐
//!         └────────────────────────── │ Authenticated │ ◄── MfaConfirmed
//!                                     └───────────────┘
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Define the FSM using rust-fsm's declarative macro.
// This generates a module `session_machine` with:
// - session_machine::State (enum)
// - session_machine::Input (enum)
// - session_machine::StateMachine (type alias)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Uninitialized)

    Uninitialized => {
        ResolvedAnonymous => Anonymous,
        ResolvedAuthenticated => Authenticated
    },
    Anonymous => {
        LoginSubmitted => Authenticating
    },
    Authenticating => {
        MfaSetupRequired => MfaSetup,
        MfaVerifyRequired => MfaVerify,
        LoginSucceeded => Authenticated,
        LoginFailed => Anonymous
    },
    MfaSetup => {
        MfaConfirmed => Authenticated,
        MfaRestart => Anonymous
    },
    MfaVerify => {
        MfaConfirmed => Authenticated,
        MfaRestart => Anonymous
    },
    Authenticated => {
        LoggedOut => Anonymous,
        SessionInvalidated => Anonymous
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Simplified session state for external consumption (guards, UI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Initial "who am I" resolution has not run yet.
    Uninitialized,
    /// No valid session.
    Anonymous,
    /// Login request in flight.
    Authenticating,
    /// Login succeeded but the user must enroll in MFA (QR payload held).
    MfaSetup,
    /// Login succeeded but the user must enter an MFA code.
    MfaVerify,
    /// Tokens and user record are stored.
    Authenticated,
}

impl SessionState {
    /// Returns true only for a fully established session.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// Returns true while the user is mid-MFA (holds a challenge, not a session).
    pub fn is_mfa_pending(&self) -> bool {
        matches!(self, SessionState::MfaSetup | SessionState::MfaVerify)
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Uninitialized => SessionState::Uninitialized,
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::Authenticating => SessionState::Authenticating,
            SessionMachineState::MfaSetup => SessionState::MfaSetup,
            SessionMachineState::MfaVerify => SessionState::MfaVerify,
            SessionMachineState::Authenticated => SessionState::Authenticated,
        }
    }
}
