use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

pub type ProfileResult<T> = core::result::Result<T, ProfileError>;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("profile service returned {0}")]
    Status(http::StatusCode),
}

pub const PROFILE_URI_BASE: &str = "https://api.beatleader.xyz";

/// Player display name plus the ordered social links the profile service
/// knows about. Fetched fresh per event — links change between scores,
/// so nothing here is cached.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerProfile {
    pub name: String,

    #[serde(default)]
    pub socials: Vec<SocialLink>,
}

/// The profile service emits `link` for some services and `userId` for
/// others, so both are optional here.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialLink {
    pub service: String,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

impl PlayerProfile {
    pub fn social(&self, service: &str) -> Option<&SocialLink> {
        self.socials.iter().find(|social| social.service == service)
    }
}

#[derive(Debug, Clone)]
pub struct ProfileClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProfileClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, player_id: &str) -> ProfileResult<PlayerProfile> {
        let uri = format!("{}/player/{}?stats=true", self.base_url, player_id);
        let response = self.http.get(uri).send().await?;

        if !response.status().is_success() {
            return Err(ProfileError::Status(response.status()));
        }

        Ok(response.json::<PlayerProfile>().await?)
    }
}
