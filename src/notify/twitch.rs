use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::auth::OauthSession;
use crate::notify::{
    Announcement, ChatTarget, NotificationResult, Notifier, NotifyError, NotifyResult,
};
use crate::util::config::Config;

pub const HELIX_URI_BASE: &str = "https://api.twitch.tv/helix";

#[derive(Debug, Clone, Deserialize)]
struct HelixDataResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct HelixUser {
    id: String,
    login: String,

    #[serde(rename = "display_name")]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct HelixStream {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct HelixClip {
    id: String,
}

#[derive(Debug, Serialize)]
struct ChatMessageBody<'a> {
    broadcaster_id: &'a str,
    sender_id: &'a str,
    message: &'a str,
}

/// Announces a filtered score on Twitch: a callout in the scoring
/// player's own channel (with a clip of their live broadcast when one
/// can be made) plus a summary in the operator's channel.
#[derive(Debug)]
pub struct ChatNotifier {
    session: Arc<OauthSession>,
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    operator_id: String,
}

impl ChatNotifier {
    pub fn new(config: &Config, session: Arc<OauthSession>) -> Self {
        Self {
            session,
            http: reqwest::Client::new(),
            base_url: HELIX_URI_BASE.to_string(),
            client_id: config.twitch_client_id.clone(),
            operator_id: config.twitch_user_id.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Sends one Helix request with the session's token, retrying once
    /// through a refresh when the platform rejects it as expired.
    async fn send_authorized(
        &self,
        operation: &'static str,
        build: impl Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    ) -> NotifyResult<reqwest::Response> {
        let token = self.session.access_token().await?;
        let response = build(&self.http, &self.base_url)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() != http::StatusCode::UNAUTHORIZED {
            return check_status(operation, response);
        }

        let token = self.session.refresh_after_reject(&token).await?;
        let response = build(&self.http, &self.base_url)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&token)
            .send()
            .await?;

        check_status(operation, response)
    }

    async fn get_user(&self, user_id: &str) -> NotifyResult<Option<HelixUser>> {
        let response = self
            .send_authorized("user lookup", |http, base| {
                http.get(format!("{}/users?id={}", base, user_id))
            })
            .await?;

        let body: HelixDataResponse<HelixUser> = response.json().await?;
        Ok(body.data.into_iter().next())
    }

    async fn get_stream(&self, user_id: &str) -> NotifyResult<Option<HelixStream>> {
        let response = self
            .send_authorized("stream lookup", |http, base| {
                http.get(format!("{}/streams?user_id={}", base, user_id))
            })
            .await?;

        let body: HelixDataResponse<HelixStream> = response.json().await?;
        Ok(body.data.into_iter().next())
    }

    async fn create_clip(&self, broadcaster_id: &str) -> NotifyResult<HelixClip> {
        let response = self
            .send_authorized("clip create", |http, base| {
                http.post(format!(
                    "{}/clips?broadcaster_id={}&has_delay=true",
                    base, broadcaster_id
                ))
            })
            .await?;

        let body: HelixDataResponse<HelixClip> = response.json().await?;
        body.data
            .into_iter()
            .next()
            .ok_or(NotifyError::EmptyData {
                operation: "clip create",
            })
    }

    async fn send_chat(&self, broadcaster_id: &str, message: &str) -> NotifyResult<()> {
        let body = ChatMessageBody {
            broadcaster_id,
            sender_id: &self.operator_id,
            message,
        };

        self.send_authorized("chat post", |http, base| {
            http.post(format!("{}/chat/messages", base)).json(&body)
        })
        .await?;

        Ok(())
    }

    /// Steps against the scoring player's channel: resolve the user,
    /// best-effort clip when they are live, then post the callout.
    /// `Ok(None)` when the platform has no user behind the social link.
    async fn notify_target(
        &self,
        target: &ChatTarget,
        announcement: &Announcement,
    ) -> NotifyResult<Option<String>> {
        let Some(user) = self.get_user(&target.user_id).await? else {
            info!(user_id = %target.user_id, "no twitch user behind the social link");
            return Ok(None);
        };

        let mut destination = format!("https://twitch.tv/{}", user.login);

        match self.get_stream(&user.id).await {
            Ok(Some(stream)) => match self.create_clip(&user.id).await {
                Ok(clip) => destination = format!("https://clips.twitch.tv/{}", clip.id),
                // clip failures never propagate; the channel URL stands in
                Err(err) => {
                    warn!(login = %user.login, stream_id = %stream.id, error = %err, "clip creation failed")
                }
            },
            Ok(None) => {}
            Err(err) => warn!(login = %user.login, error = %err, "stream lookup failed"),
        }

        let callout = format!(
            "! WHEN YOU SEE IT! You just got a {}% on {} ({}) {}",
            announcement.percent, announcement.song, announcement.difficulty, destination
        );
        self.send_chat(&user.id, &callout).await?;

        info!(login = %user.login, name = %user.name, %destination, "announced in target channel");
        Ok(Some(destination))
    }
}

fn check_status(
    operation: &'static str,
    response: reqwest::Response,
) -> NotifyResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NotifyError::Status { operation, status })
    }
}

#[async_trait]
impl Notifier for ChatNotifier {
    fn platform(&self) -> &'static str {
        "twitch"
    }

    #[instrument(skip(self, announcement), fields(score_id = announcement.score_id))]
    async fn announce(&self, announcement: &Announcement) -> NotificationResult {
        let mut destination = announcement.replay_url.clone();
        let mut failure = None;

        match &announcement.chat_target {
            Some(target) => match self.notify_target(target, announcement).await {
                Ok(Some(url)) => destination = url,
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "target channel announcement failed");
                    failure = Some(err.to_string());
                }
            },
            None => failure = Some("announcement has no chat target".to_string()),
        }

        // the operator-channel summary goes out whatever happened above
        let summary = format!(
            "{} just got a {}% on {} ({}) {}",
            announcement.player_name,
            announcement.percent,
            announcement.song,
            announcement.difficulty,
            destination
        );

        if let Err(err) = self.send_chat(&self.operator_id, &summary).await {
            error!(error = %err, "operator summary failed");
            failure = Some(err.to_string());
        }

        match failure {
            None => NotificationResult::Delivered {
                url: Some(destination),
            },
            Some(reason) => NotificationResult::Failed { reason },
        }
    }
}
