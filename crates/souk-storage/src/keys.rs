//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer access token (short-lived)
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Refresh token (long-lived)
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Serialized user record (JSON)
    pub const USER_RECORD: &'static str = "user_record";

    /// Ephemeral MFA challenge (JSON, session-scoped storage only)
    pub const MFA_CHALLENGE: &'static str = "mfa_challenge";
}
