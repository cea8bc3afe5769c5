use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::auth::{AuthError, AuthResult, Credential};
use crate::store::TokenStore;
use crate::util::config::Config;

pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const TWITTER_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";

/// Where a platform expects the client credentials during a refresh
/// exchange: Twitch takes them as form fields, Twitter as HTTP Basic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    Form,
    Basic,
}

#[derive(Debug, Clone)]
pub struct PlatformSpec {
    pub platform: &'static str,
    pub store_key: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub client_auth: ClientAuth,
}

impl PlatformSpec {
    pub fn twitch(config: &Config) -> Self {
        Self {
            platform: "twitch",
            store_key: format!("twitch:{}", config.twitch_user_id),
            token_url: TWITCH_TOKEN_URL.to_string(),
            client_id: config.twitch_client_id.clone(),
            client_secret: config.twitch_client_secret.clone(),
            client_auth: ClientAuth::Form,
        }
    }

    pub fn twitter(config: &Config) -> Self {
        Self {
            platform: "twitter",
            store_key: format!("twitter:{}", config.twitter_client_id),
            token_url: TWITTER_TOKEN_URL.to_string(),
            client_id: config.twitter_client_id.clone(),
            client_secret: config.twitter_client_secret.clone(),
            client_auth: ClientAuth::Basic,
        }
    }
}

/// Collaborator that can mint a first credential through the interactive
/// authorization-code exchange. That flow lives outside this process; a
/// session with nothing persisted and no flow available stays
/// `NotAuthorized` until a credential shows up in the store.
#[async_trait]
pub trait CredentialBootstrap: Send + Sync {
    async fn acquire(&self) -> AuthResult<Credential>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// One platform's refreshable credential plus the authenticated-request
/// capability built on it. The credential sits behind a mutex: a refresh
/// holds the lock across the whole exchange, so concurrent callers wait
/// for it and observe its result instead of spending the single-use
/// refresh token a second time.
#[derive(Debug)]
pub struct OauthSession {
    spec: PlatformSpec,
    store: Arc<dyn TokenStore>,
    http: reqwest::Client,
    credential: Mutex<Option<Credential>>,
}

impl OauthSession {
    pub fn new(spec: PlatformSpec, store: Arc<dyn TokenStore>) -> Self {
        Self {
            spec,
            store,
            http: reqwest::Client::new(),
            credential: Mutex::new(None),
        }
    }

    pub fn platform(&self) -> &'static str {
        self.spec.platform
    }

    /// Load the persisted credential, or mint one through the bootstrap
    /// collaborator when the store has nothing under this session's key.
    #[instrument(skip(self, flow), fields(platform = self.spec.platform))]
    pub async fn bootstrap(&self, flow: Option<&dyn CredentialBootstrap>) -> AuthResult<()> {
        let mut slot = self.credential.lock().await;

        if let Some(blob) = self.store.get(&self.spec.store_key).await? {
            *slot = Some(serde_json::from_str(&blob)?);
            info!("loaded persisted credential");
            return Ok(());
        }

        let Some(flow) = flow else {
            return Err(AuthError::NotAuthorized);
        };

        let fresh = flow.acquire().await?;
        self.persist(&fresh).await?;
        *slot = Some(fresh);
        info!("credential acquired through authorization flow");

        Ok(())
    }

    /// Current access token, refreshed first when the expiry stamp says
    /// it has gone stale.
    pub async fn access_token(&self) -> AuthResult<String> {
        let mut slot = self.credential.lock().await;
        let current = slot.as_ref().ok_or(AuthError::NotAuthorized)?;

        if !current.is_stale() {
            return Ok(current.access_token.clone());
        }

        let refreshed = self.exchange(&current.refresh_token).await?;
        self.persist(&refreshed).await?;
        let token = refreshed.access_token.clone();
        *slot = Some(refreshed);

        Ok(token)
    }

    /// Force a refresh after the platform rejected `rejected_token`.
    /// When a sibling caller already replaced it, the newer token comes
    /// back without another exchange.
    #[instrument(skip(self, rejected_token), fields(platform = self.spec.platform))]
    pub async fn refresh_after_reject(&self, rejected_token: &str) -> AuthResult<String> {
        let mut slot = self.credential.lock().await;
        let current = slot.as_ref().ok_or(AuthError::NotAuthorized)?;

        if current.access_token != rejected_token {
            return Ok(current.access_token.clone());
        }

        let refreshed = self.exchange(&current.refresh_token).await?;
        self.persist(&refreshed).await?;
        let token = refreshed.access_token.clone();
        *slot = Some(refreshed);

        Ok(token)
    }

    async fn exchange(&self, refresh_token: &str) -> AuthResult<Credential> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let request = match self.spec.client_auth {
            ClientAuth::Form => {
                form.push(("client_id", self.spec.client_id.as_str()));
                form.push(("client_secret", self.spec.client_secret.as_str()));
                self.http.post(&self.spec.token_url)
            }
            ClientAuth::Basic => self
                .http
                .post(&self.spec.token_url)
                .basic_auth(&self.spec.client_id, Some(&self.spec.client_secret)),
        };

        let response = request.form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            warn!(
                platform = self.spec.platform,
                %status,
                "refresh exchange rejected; keeping the stale credential"
            );
            return Err(AuthError::RefreshRejected { status, detail });
        }

        let body: TokenResponse = response.json().await?;
        info!(platform = self.spec.platform, "refreshed credential");

        Ok(Credential::from_exchange(
            body.access_token,
            // platforms that rotate the refresh token send a new one;
            // otherwise the old one stays valid
            body.refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
            body.expires_in,
        ))
    }

    async fn persist(&self, credential: &Credential) -> AuthResult<()> {
        let blob = serde_json::to_string(credential)?;
        self.store.put(&self.spec.store_key, &blob).await?;

        Ok(())
    }
}
