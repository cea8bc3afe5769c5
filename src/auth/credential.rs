use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One platform's OAuth2 access/refresh token pair. Persisted as an
/// opaque JSON blob keyed by `(platform, account)`; owned exclusively by
/// that platform's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "accessToken")]
    pub access_token: String,

    #[serde(rename = "refreshToken")]
    pub refresh_token: String,

    #[serde(rename = "expiresAt", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Margin applied ahead of the recorded expiry so a token refreshes
/// before the platform starts rejecting it.
const EXPIRY_MARGIN_SECS: i64 = 30;

impl Credential {
    pub fn from_exchange(
        access_token: String,
        refresh_token: String,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }

    /// A credential without an expiry stamp is assumed valid until a
    /// platform call says otherwise.
    pub fn is_stale(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= at,
            None => false,
        }
    }
}
