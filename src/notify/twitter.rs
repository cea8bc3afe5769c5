use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::auth::OauthSession;
use crate::notify::{Announcement, NotificationResult, Notifier, NotifyError, NotifyResult};

pub const TWITTER_URI_BASE: &str = "https://api.twitter.com";

#[derive(Debug, Serialize)]
struct TweetBody<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

/// Announces a filtered score as one composed text post.
#[derive(Debug)]
pub struct SocialNotifier {
    session: Arc<OauthSession>,
    http: reqwest::Client,
    base_url: String,
}

impl SocialNotifier {
    pub fn new(session: Arc<OauthSession>) -> Self {
        Self {
            session,
            http: reqwest::Client::new(),
            base_url: TWITTER_URI_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn send_tweet(&self, token: &str, text: &str) -> NotifyResult<reqwest::Response> {
        Ok(self
            .http
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(token)
            .json(&TweetBody { text })
            .send()
            .await?)
    }

    async fn post_tweet(&self, text: &str) -> NotifyResult<TweetResponse> {
        let token = self.session.access_token().await?;
        let mut response = self.send_tweet(&token, text).await?;

        if response.status() == http::StatusCode::UNAUTHORIZED {
            let token = self.session.refresh_after_reject(&token).await?;
            response = self.send_tweet(&token, text).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                operation: "tweet",
                status,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Notifier for SocialNotifier {
    fn platform(&self) -> &'static str {
        "twitter"
    }

    #[instrument(skip(self, announcement), fields(score_id = announcement.score_id))]
    async fn announce(&self, announcement: &Announcement) -> NotificationResult {
        let text = format!(
            "#WYSI {} just got {}% on {} ({}) on #BeatSaber! {}",
            announcement.handle,
            announcement.percent,
            announcement.song,
            announcement.difficulty,
            announcement.replay_url
        );

        match self.post_tweet(&text).await {
            Ok(posted) => {
                info!(tweet_id = %posted.data.id, "posted score callout");
                NotificationResult::Delivered { url: None }
            }
            Err(err) => {
                error!(error = %err, "tweet failed");
                NotificationResult::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{ClientAuth, Credential, PlatformSpec};
    use crate::store::{SqliteTokenStore, TokenStore};

    async fn authorized_session(token_url: &str) -> Arc<OauthSession> {
        let store = Arc::new(SqliteTokenStore::in_memory().await.unwrap());
        let credential = Credential {
            access_token: "tw-token".to_string(),
            refresh_token: "tw-refresh".to_string(),
            expires_at: None,
        };
        store
            .put("twitter:cid", &serde_json::to_string(&credential).unwrap())
            .await
            .unwrap();

        let spec = PlatformSpec {
            platform: "twitter",
            store_key: "twitter:cid".to_string(),
            token_url: token_url.to_string(),
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            client_auth: ClientAuth::Basic,
        };

        let session = Arc::new(OauthSession::new(spec, store));
        session.bootstrap(None).await.unwrap();
        session
    }

    fn announcement() -> Announcement {
        Announcement {
            score_id: 42,
            percent: "72.7".to_string(),
            song: "Time Files".to_string(),
            difficulty: "Expert+".to_string(),
            replay_url: "https://replay.beatleader.xyz/?scoreId=42".to_string(),
            player_name: "tester".to_string(),
            handle: "@tester".to_string(),
            chat_target: None,
        }
    }

    #[tokio::test]
    async fn posts_the_composed_callout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("authorization", "Bearer tw-token"))
            .and(body_string_contains("#WYSI @tester just got 72.7%"))
            .and(body_string_contains("replay.beatleader.xyz/?scoreId=42"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": { "id": "1881", "text": "..." }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = authorized_session("http://unused.invalid").await;
        let notifier = SocialNotifier::new(session).with_base_url(&server.uri());

        let result = notifier.announce(&announcement()).await;
        assert_eq!(result, NotificationResult::Delivered { url: None });
    }

    #[tokio::test]
    async fn rejected_token_refreshes_once_and_retries() {
        let server = MockServer::start().await;

        // expired bearer bounces exactly once
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("authorization", "Bearer tw-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tw-token-2",
                "refresh_token": "tw-refresh-2",
                "expires_in": 7200,
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header("authorization", "Bearer tw-token-2"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": { "id": "1882", "text": "..." }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = authorized_session(&format!("{}/2/oauth2/token", server.uri())).await;
        let notifier = SocialNotifier::new(session).with_base_url(&server.uri());

        let result = notifier.announce(&announcement()).await;
        assert_eq!(result, NotificationResult::Delivered { url: None });
    }

    #[tokio::test]
    async fn rate_limit_reports_a_failed_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let session = authorized_session("http://unused.invalid").await;
        let notifier = SocialNotifier::new(session).with_base_url(&server.uri());

        let result = notifier.announce(&announcement()).await;
        assert!(matches!(result, NotificationResult::Failed { .. }));
    }
}
