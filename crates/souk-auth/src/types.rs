//! Wire types for the auth endpoints and their normalization into the
//! client-side records.
//!
//! The server's user payload is not stable across deployments: the vendor
//! approval flag has appeared under four different field names. Everything
//! here collapses those variants at the boundary so the rest of the client
//! only ever sees the closed [`ApprovalStatus`] enum.

use serde::Deserialize;
use souk_storage::{ApprovalStatus, Role, UserRecord};

/// User object as the server sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub category_id: Option<String>,
    // Approval has shipped under all of these names. Values may be strings
    // or booleans, so they are captured loosely and normalized below.
    #[serde(default)]
    pub approved: Option<serde_json::Value>,
    #[serde(default)]
    pub approval_status: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub vendor_status: Option<serde_json::Value>,
    #[serde(default)]
    pub mfa_verified: bool,
    #[serde(default)]
    pub email_verified: bool,
}

impl WireUser {
    /// Collapse the wire shape into the client-side record.
    pub fn normalize(self) -> UserRecord {
        let approval = if self.role == Role::Vendor {
            normalize_approval(&[
                &self.approved,
                &self.approval_status,
                &self.status,
                &self.vendor_status,
            ])
        } else {
            // Approval only gates vendors.
            ApprovalStatus::Approved
        };

        UserRecord {
            id: self.id,
            role: self.role,
            category_id: self.category_id,
            approval,
            mfa_verified: self.mfa_verified,
            email_verified: self.email_verified,
        }
    }
}

/// Pick the first present approval field and map it to the closed enum.
/// Unrecognized values mean "not approved yet", never "approved".
fn normalize_approval(fields: &[&Option<serde_json::Value>]) -> ApprovalStatus {
    for field in fields {
        let Some(value) = field else { continue };
        match value {
            serde_json::Value::Bool(true) => return ApprovalStatus::Approved,
            serde_json::Value::Bool(false) => return ApprovalStatus::Pending,
            serde_json::Value::String(s) => {
                return match s.to_ascii_lowercase().as_str() {
                    "approved" | "accepted" => ApprovalStatus::Approved,
                    "rejected" | "declined" => ApprovalStatus::Rejected,
                    _ => ApprovalStatus::Pending,
                };
            }
            _ => continue,
        }
    }
    ApprovalStatus::Pending
}

/// Response of the login endpoint. Fields vary with the branch taken
/// (direct success, MFA setup, MFA verify), so everything is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub mfa_required: bool,
    #[serde(default)]
    pub mfa_setup: bool,
    #[serde(default)]
    pub mfa_token: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<WireUser>,
}

/// Response of the refresh endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// What a login attempt produced from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Session established, tokens and user record stored.
    Authenticated(UserRecord),
    /// The user must enroll in MFA; the QR payload is in the snapshot.
    MfaSetupRequired,
    /// The user must provide an MFA code.
    MfaVerificationRequired,
}

/// Point-in-time view of the session, derived from storage on every read
/// so it can never disagree with the token store.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Whether the initial session resolution has completed.
    pub initialized: bool,
    /// The authenticated user, if any.
    pub user: Option<UserRecord>,
    /// True while an MFA challenge is outstanding.
    pub mfa_in_progress: bool,
}
