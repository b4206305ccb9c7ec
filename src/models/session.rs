use serde::{Deserialize, Serialize};

/// Tokens are refreshed once they are within this window of expiry.
pub const REFRESH_WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at_ms: Option<i64>,
}

impl Session {
    /// Token present and expiry strictly in the future.
    pub fn is_authenticated_at(&self, now_ms: i64) -> bool {
        self.access_token.is_some() && self.expires_at_ms.map_or(false, |exp| exp > now_ms)
    }

    /// Expired, or expiring within [`REFRESH_WINDOW_MS`] (inclusive).
    pub fn needs_refresh_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms
            .map_or(true, |exp| exp <= now_ms + REFRESH_WINDOW_MS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    AwaitingCallback,
    LoggedIn,
    Refreshing,
}

/// Transient PKCE parameters kept for one redirect round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_verifier: String,
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Query parameters of the authorization redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Authenticated,
    /// Code or state missing; nothing was done.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthEvent {
    pub authenticated: bool,
    /// Set when an authorization callback was denied or could not be completed.
    pub failed: bool,
}
