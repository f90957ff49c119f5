//! Session lifecycle orchestration.
//!
//! [`SessionManager`] owns the session state machine and drives it through
//! login, MFA, refresh failure and logout. All session facts (tokens, user
//! record, MFA challenge) live in the credential store; the manager never
//! caches them, so a snapshot can never disagree with storage.
//!
//! Every user action bumps a generation counter. A response that lands
//! after a newer action observes the mismatch and is discarded, so a slow
//! login reply cannot resurrect a session the user already abandoned.

use crate::api::ApiClient;
use crate::error::{AuthError, AuthResult};
use crate::session_fsm::{SessionInput, SessionMachine, SessionState};
use crate::types::{LoginOutcome, LoginResponse, SessionSnapshot};
use reqwest::StatusCode;
use souk_storage::{ApprovalStatus, CredentialStore, MfaChallenge, UserRecord};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Callback invoked after every state transition.
pub type StateCallback = Box<dyn Fn(SessionState) + Send + Sync>;

pub struct SessionManager {
    api: Arc<ApiClient>,
    store: Arc<CredentialStore>,
    fsm: Mutex<SessionMachine>,
    initialized: AtomicBool,
    /// Bumped on every user action; in-flight responses from an older
    /// generation are discarded.
    generation: AtomicU64,
    state_callback: Mutex<Option<StateCallback>>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>, store: Arc<CredentialStore>) -> Self {
        Self {
            api,
            store,
            fsm: Mutex::new(SessionMachine::new()),
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            state_callback: Mutex::new(None),
        }
    }

    /// Register a callback for state transitions (UI re-render hook).
    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(SessionState) + Send + Sync + 'static,
    {
        *self.state_callback.lock().unwrap() = Some(Box::new(callback));
    }

    /// Current state of the session machine.
    pub fn state(&self) -> SessionState {
        SessionState::from(self.fsm.lock().unwrap().state())
    }

    /// Point-in-time view, derived from the store on every call.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            initialized: self.initialized.load(Ordering::SeqCst),
            user: self.store.user_record().ok().flatten(),
            mfa_in_progress: self.store.mfa_challenge().ok().flatten().is_some(),
        }
    }

    /// QR provisioning payload of the outstanding MFA setup challenge.
    pub fn mfa_qr_payload(&self) -> Option<String> {
        self.store
            .mfa_challenge()
            .ok()
            .flatten()
            .and_then(|c| c.qr_payload)
    }

    fn transition(&self, input: SessionInput) -> AuthResult<()> {
        let state = {
            let mut fsm = self.fsm.lock().unwrap();
            fsm.consume(&input).map_err(|_| {
                AuthError::InvalidStateTransition(format!(
                    "{:?} rejected in state {:?}",
                    input,
                    fsm.state()
                ))
            })?;
            SessionState::from(fsm.state())
        };

        if let Some(callback) = self.state_callback.lock().unwrap().as_ref() {
            callback(state);
        }
        Ok(())
    }

    // ==========================================
    // Initialization
    // ==========================================

    /// Resolve the persisted session exactly once. Until this runs, the
    /// machine sits in `Uninitialized` and route guards hold rendering.
    pub async fn initialize(&self) -> AuthResult<SessionSnapshot> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(self.snapshot());
        }

        let has_session = self.store.has_session()?;
        let user = self.store.user_record()?;

        if has_session && user.is_some() {
            info!("Restored persisted session");
            self.transition(SessionInput::ResolvedAuthenticated)?;
        } else {
            if has_session {
                // Tokens without a readable user record are unusable.
                warn!("Token pair present but no user record, discarding");
                self.store.clear()?;
            }
            self.transition(SessionInput::ResolvedAnonymous)?;
        }

        Ok(self.snapshot())
    }

    // ==========================================
    // Login
    // ==========================================

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginOutcome> {
        // The transition gates re-entry; only an accepted attempt may claim
        // a new generation. A rejected double-submit must not invalidate
        // the attempt already in flight.
        self.transition(SessionInput::LoginSubmitted)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let body = serde_json::json!({ "email": email, "password": password });
        let response = match self.api.post_public("auth/login/", &body).await {
            Ok(response) => response,
            Err(e) => {
                let _ = self.transition(SessionInput::LoginFailed);
                return Err(e);
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            // A newer action (logout) owns the session now. Step back out
            // of Authenticating so the login form is usable again.
            let _ = self.transition(SessionInput::LoginFailed);
            return Err(AuthError::Superseded);
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            let detail = error_detail(response).await;
            self.transition(SessionInput::LoginFailed)?;
            return Err(AuthError::InvalidCredentials(detail));
        }
        if !status.is_success() {
            let _ = self.transition(SessionInput::LoginFailed);
            return Err(AuthError::Protocol(format!("login returned {}", status)));
        }

        let parsed: LoginResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = self.transition(SessionInput::LoginFailed);
                return Err(AuthError::Protocol(format!("bad login response: {}", e)));
            }
        };

        if parsed.mfa_required {
            let Some(mfa_token) = parsed.mfa_token else {
                let _ = self.transition(SessionInput::LoginFailed);
                return Err(AuthError::Protocol(
                    "MFA required but no challenge token in response".to_string(),
                ));
            };
            // An enrollment challenge without a QR payload gives the setup
            // screen nothing to render.
            if parsed.mfa_setup && parsed.qr_code.is_none() {
                let _ = self.transition(SessionInput::LoginFailed);
                return Err(AuthError::Protocol(
                    "MFA enrollment required but no QR payload in response".to_string(),
                ));
            }
            let challenge = MfaChallenge {
                mfa_token,
                setup_required: parsed.mfa_setup,
                qr_payload: parsed.qr_code,
            };
            self.store.set_mfa_challenge(&challenge)?;

            if challenge.setup_required {
                info!("Login requires MFA enrollment");
                self.transition(SessionInput::MfaSetupRequired)?;
                return Ok(LoginOutcome::MfaSetupRequired);
            }
            info!("Login requires MFA verification");
            self.transition(SessionInput::MfaVerifyRequired)?;
            return Ok(LoginOutcome::MfaVerificationRequired);
        }

        let (access, refresh, user) = match (parsed.access, parsed.refresh, parsed.user) {
            (Some(access), Some(refresh), Some(user)) => (access, refresh, user),
            _ => {
                let _ = self.transition(SessionInput::LoginFailed);
                return Err(AuthError::Protocol(
                    "login response missing tokens or user".to_string(),
                ));
            }
        };

        let user = user.normalize();
        if user.approval != ApprovalStatus::Approved {
            // Identity verified but admission not granted. Tokens are
            // deliberately not persisted.
            info!(user_id = %user.id, "Vendor login blocked pending approval");
            self.transition(SessionInput::LoginFailed)?;
            return Err(AuthError::VendorNotApproved);
        }

        self.store.set_session(&access, &refresh, &user)?;
        self.transition(SessionInput::LoginSucceeded)?;
        info!(user_id = %user.id, "Login succeeded");
        Ok(LoginOutcome::Authenticated(user))
    }

    // ==========================================
    // MFA
    // ==========================================

    /// Verify a code against an existing MFA enrollment.
    pub async fn verify_mfa(&self, code: &str) -> AuthResult<UserRecord> {
        self.complete_mfa(code).await
    }

    /// Confirm first-time MFA enrollment with a code from the new device.
    pub async fn confirm_mfa_setup(&self, code: &str) -> AuthResult<UserRecord> {
        self.complete_mfa(code).await
    }

    async fn complete_mfa(&self, code: &str) -> AuthResult<UserRecord> {
        let generation = self.generation.load(Ordering::SeqCst);
        let Some(challenge) = self.store.mfa_challenge()? else {
            return Err(AuthError::InvalidStateTransition(
                "no MFA challenge in progress".to_string(),
            ));
        };

        let body = serde_json::json!({ "mfa_token": challenge.mfa_token, "code": code });
        let response = self.api.post_public("auth/verify-mfa/", &body).await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(AuthError::Superseded);
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            // Challenge stays in place so the user can retry.
            return Err(AuthError::MfaCodeInvalid);
        }
        if !status.is_success() {
            return Err(AuthError::Protocol(format!(
                "MFA verification returned {}",
                status
            )));
        }

        let parsed: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Protocol(format!("bad MFA response: {}", e)))?;

        let (access, refresh, user) = match (parsed.access, parsed.refresh, parsed.user) {
            (Some(access), Some(refresh), Some(user)) => (access, refresh, user),
            _ => {
                return Err(AuthError::Protocol(
                    "MFA response missing tokens or user".to_string(),
                ))
            }
        };

        let mut user = user.normalize();
        user.mfa_verified = true;

        if user.approval != ApprovalStatus::Approved {
            self.store.clear_mfa_challenge()?;
            self.transition(SessionInput::MfaRestart)?;
            return Err(AuthError::VendorNotApproved);
        }

        self.store.clear_mfa_challenge()?;
        self.store.set_session(&access, &refresh, &user)?;
        self.transition(SessionInput::MfaConfirmed)?;
        info!(user_id = %user.id, "MFA completed, session established");
        Ok(user)
    }

    /// Abandon the outstanding MFA challenge and return to the login form.
    pub fn restart_login(&self) -> AuthResult<()> {
        self.store.clear_mfa_challenge()?;
        self.transition(SessionInput::MfaRestart)
    }

    // ==========================================
    // Logout
    // ==========================================

    /// End this session. Server-side revocation is best-effort; the local
    /// session is cleared regardless.
    pub async fn logout(&self) -> AuthResult<()> {
        self.end_session("auth/logout/").await
    }

    /// Revoke every session of this account, then clear locally.
    pub async fn logout_everywhere(&self) -> AuthResult<()> {
        self.end_session("auth/logout-all/").await
    }

    async fn end_session(&self, path: &str) -> AuthResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(refresh) = self.store.refresh_token()? {
            let body = serde_json::json!({ "refresh": refresh });
            if let Err(e) = self.api.post(path, &body).await {
                warn!(error = %e, "Server-side logout failed, clearing local session anyway");
            }
        }

        self.store.clear()?;
        self.store.clear_mfa_challenge()?;
        let _ = self.transition(SessionInput::LoggedOut);
        info!("Session ended");
        Ok(())
    }

    /// Drop the session after an unrecoverable auth failure (refresh token
    /// rejected). No server call; the tokens are already dead.
    pub fn mark_session_invalid(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear credential store");
        }
        let _ = self.transition(SessionInput::SessionInvalidated);
    }
}

async fn error_detail(response: reqwest::Response) -> String {
    response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| "request rejected".to_string())
}
