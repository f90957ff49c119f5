//! High-level API for the persisted session state.

use crate::{ClientStorage, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};

/// User role in the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

/// Normalized vendor approval status.
///
/// The server exposes this under several field names and spellings; the
/// auth layer collapses all of them into this closed enum before anything
/// else sees the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Approved,
    Pending,
    Rejected,
}

/// The authenticated user record, as persisted client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID
    pub id: String,
    /// Role (customer, vendor, admin)
    pub role: Role,
    /// Vendor category id, when the vendor has one assigned
    #[serde(default)]
    pub category_id: Option<String>,
    /// Normalized approval status (always Approved for non-vendors)
    pub approval: ApprovalStatus,
    /// Whether MFA has been verified for this session
    #[serde(default)]
    pub mfa_verified: bool,
    /// Whether the account email is verified
    #[serde(default)]
    pub email_verified: bool,
}

/// Short-lived MFA challenge, held outside the session because the user is
/// not yet authenticated. Lives only in the ephemeral storage slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfaChallenge {
    /// Opaque token identifying the challenge to the server
    pub mfa_token: String,
    /// True when the user must first enroll (scan a QR payload)
    pub setup_required: bool,
    /// QR provisioning payload, present only for setup challenges
    #[serde(default)]
    pub qr_payload: Option<String>,
}

/// Typed facade over the two storage slots: the persistent document for
/// tokens and the user record, and an ephemeral slot for the MFA challenge.
///
/// This is the single authoritative home of the token pair; callers must
/// not cache tokens beyond one outstanding request.
pub struct CredentialStore {
    persistent: Box<dyn ClientStorage>,
    ephemeral: Box<dyn ClientStorage>,
}

impl CredentialStore {
    /// Create a credential store over the given backends.
    pub fn new(persistent: Box<dyn ClientStorage>, ephemeral: Box<dyn ClientStorage>) -> Self {
        Self {
            persistent,
            ephemeral,
        }
    }

    // ==========================================
    // Token pair
    // ==========================================

    /// Store the access token.
    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.persistent.set(StorageKeys::ACCESS_TOKEN, token)
    }

    /// Retrieve the access token.
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.persistent.get(StorageKeys::ACCESS_TOKEN)
    }

    /// Store the refresh token.
    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.persistent.set(StorageKeys::REFRESH_TOKEN, token)
    }

    /// Retrieve the refresh token.
    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.persistent.get(StorageKeys::REFRESH_TOKEN)
    }

    // ==========================================
    // User record
    // ==========================================

    /// Store the serialized user record.
    pub fn set_user_record(&self, user: &UserRecord) -> StorageResult<()> {
        let json = serde_json::to_string(user)?;
        self.persistent.set(StorageKeys::USER_RECORD, &json)
    }

    /// Retrieve the user record, if one is persisted.
    ///
    /// A record that no longer deserializes (schema drift across app
    /// versions) is treated as absent rather than an error.
    pub fn user_record(&self) -> StorageResult<Option<UserRecord>> {
        match self.persistent.get(StorageKeys::USER_RECORD)? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    tracing::warn!(error = %e, "Persisted user record is unreadable, ignoring");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Store the full session in one call (login / MFA verification).
    pub fn set_session(&self, access: &str, refresh: &str, user: &UserRecord) -> StorageResult<()> {
        self.set_access_token(access)?;
        self.set_refresh_token(refresh)?;
        self.set_user_record(user)
    }

    /// Whether a token pair is present.
    pub fn has_session(&self) -> StorageResult<bool> {
        Ok(self.persistent.has(StorageKeys::ACCESS_TOKEN)?
            && self.persistent.has(StorageKeys::REFRESH_TOKEN)?)
    }

    /// Clear tokens and the user record (logout, refresh failure).
    pub fn clear(&self) -> StorageResult<()> {
        self.persistent.delete(StorageKeys::ACCESS_TOKEN)?;
        self.persistent.delete(StorageKeys::REFRESH_TOKEN)?;
        self.persistent.delete(StorageKeys::USER_RECORD)?;
        Ok(())
    }

    // ==========================================
    // MFA challenge (ephemeral only)
    // ==========================================

    /// Store the MFA challenge in the ephemeral slot.
    pub fn set_mfa_challenge(&self, challenge: &MfaChallenge) -> StorageResult<()> {
        let json = serde_json::to_string(challenge)?;
        self.ephemeral.set(StorageKeys::MFA_CHALLENGE, &json)
    }

    /// Retrieve the MFA challenge, if one is in progress.
    pub fn mfa_challenge(&self) -> StorageResult<Option<MfaChallenge>> {
        match self.ephemeral.get(StorageKeys::MFA_CHALLENGE)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Clear the MFA challenge (successful verification, or back to login).
    pub fn clear_mfa_challenge(&self) -> StorageResult<()> {
        self.ephemeral.delete(StorageKeys::MFA_CHALLENGE)?;
        Ok(())
    }
}
