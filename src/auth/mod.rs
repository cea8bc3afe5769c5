pub mod credential;
pub mod session;

pub use credential::Credential;
pub use session::{ClientAuth, CredentialBootstrap, OauthSession, PlatformSpec};

use thiserror::Error;

use crate::store::StoreError;

pub type AuthResult<T> = core::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no usable credential for this session; run the authorization flow first")]
    NotAuthorized,

    #[error("token refresh rejected ({status}): {detail}")]
    RefreshRejected {
        status: http::StatusCode,
        detail: String,
    },

    #[error("token endpoint error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("credential blob error: {0}")]
    Blob(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
