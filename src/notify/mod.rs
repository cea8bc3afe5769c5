pub mod twitch;
pub mod twitter;

use core::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::AuthError;

pub type NotifyResult<T> = core::result::Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("platform request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{operation} returned {status}")]
    Status {
        operation: &'static str,
        status: http::StatusCode,
    },

    #[error("{operation} returned an empty data field")]
    EmptyData { operation: &'static str },
}

/// Everything a notifier needs to announce one filtered score. Built
/// once per dispatched event; each platform derives its own destination
/// URL from it.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub score_id: i64,
    pub percent: String,
    pub song: String,
    pub difficulty: String,
    pub replay_url: String,
    pub player_name: String,

    /// Display handle for the social post: `@handle` from a Twitter
    /// social link when one exists, otherwise the profile name.
    pub handle: String,

    /// Platform user behind the profile's Twitch social entry, when it
    /// carries one.
    pub chat_target: Option<ChatTarget>,
}

#[derive(Debug, Clone)]
pub struct ChatTarget {
    pub user_id: String,
}

/// Per-platform outcome for one dispatched event. Produced once per
/// notifier, never shared between platforms.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    Delivered { url: Option<String> },
    Failed { reason: String },
}

#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    fn platform(&self) -> &'static str;

    /// Best-effort, at-most-once. Implementations capture their own
    /// failures into the result; nothing raises past the dispatcher.
    async fn announce(&self, announcement: &Announcement) -> NotificationResult;
}
