use thiserror::Error;

pub const DEFAULT_FEED_URL: &str = "wss://api.beatleader.xyz/scores";
pub const DEFAULT_DATABASE_PATH: &str = "data/db.sqlite";

pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
}

/// Operator settings, read once at startup. A missing required variable
/// is the only error that is allowed to take the process down.
#[derive(Debug, Clone)]
pub struct Config {
    pub feed_url: String,
    pub database_path: String,

    pub twitch_user_id: String,
    pub twitch_client_id: String,
    pub twitch_client_secret: String,

    pub twitter_client_id: String,
    pub twitter_client_secret: String,
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            feed_url: optional("FEED_URL", DEFAULT_FEED_URL),
            database_path: optional("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            twitch_user_id: required("TWITCH_USER_ID")?,
            twitch_client_id: required("TWITCH_CLIENT_ID")?,
            twitch_client_secret: required("TWITCH_CLIENT_SECRET")?,
            twitter_client_id: required("TWITTER_CLIENT_ID")?,
            twitter_client_secret: required("TWITTER_CLIENT_SECRET")?,
        })
    }
}

fn required(name: &'static str) -> ConfigResult<String> {
    dotenvy::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    dotenvy::var(name).unwrap_or_else(|_| default.to_string())
}
