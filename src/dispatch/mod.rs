use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, instrument};

use crate::feed::types::ScoreEvent;
use crate::notify::{Announcement, ChatTarget, NotificationResult, Notifier};
use crate::profile::{PlayerProfile, ProfileClient};

const TRIGGER_DIGITS: &str = "727";

/// Two-decimal percentage for a raw 0–1 accuracy ratio.
pub fn accuracy_percent(accuracy: f64) -> f64 {
    (accuracy * 10_000.0).round() / 100.0
}

/// Shortest decimal rendering of the percentage, as it reads in the
/// announcements ("72.7", not "72.70").
pub fn percent_label(accuracy: f64) -> String {
    format!("{}", accuracy_percent(accuracy))
}

/// The fixed trigger: accept iff the percentage's digit string contains
/// `727` once the decimal point is stripped.
pub fn is_trigger(accuracy: f64) -> bool {
    percent_label(accuracy).replace('.', "").contains(TRIGGER_DIGITS)
}

/// Consumes decoded feed events, filters for the trigger pattern,
/// enriches matches with the player's profile, and fans each one out to
/// both platform notifiers.
#[derive(Debug)]
pub struct ScoreDispatcher {
    profiles: ProfileClient,
    chat: Arc<dyn Notifier>,
    social: Arc<dyn Notifier>,
}

impl ScoreDispatcher {
    pub fn new(
        profiles: ProfileClient,
        chat: Arc<dyn Notifier>,
        social: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            profiles,
            chat,
            social,
        }
    }

    /// Consume events until the channel closes. The filter runs inline
    /// in arrival order; each passing event's enrichment and fan-out is
    /// its own task, so a slow notification never holds up the next
    /// score.
    pub async fn run(self: Arc<Self>, mut events: UnboundedReceiver<ScoreEvent>) {
        while let Some(event) = events.recv().await {
            let percent = percent_label(event.accuracy);
            debug!(
                score_id = event.id,
                player = %event.player.name,
                player_id = %event.player.id,
                percent = %percent,
                song = %event.leaderboard.song.name,
                difficulty = %event.leaderboard.difficulty.difficulty_name,
                timepost = event.timepost,
                "score received"
            );

            if !is_trigger(event.accuracy) {
                continue;
            }

            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move { dispatcher.handle_match(event).await });
        }
    }

    /// Enrichment and fan-out for one event that passed the filter. Runs
    /// to completion or failure; nothing cancels it.
    #[instrument(skip(self, event), fields(score_id = event.id))]
    pub async fn handle_match(&self, event: ScoreEvent) {
        let profile = match self.profiles.fetch(&event.player_id).await {
            Ok(profile) => profile,
            Err(err) => {
                error!(error = %err, "profile fetch failed; dropping this event");
                return;
            }
        };

        let announcement = build_announcement(&event, &profile);
        info!(
            handle = %announcement.handle,
            has_chat_target = announcement.chat_target.is_some(),
            "score matched the trigger"
        );

        // both platforms run concurrently and fail independently
        let (chat_result, social_result) = tokio::join!(
            async {
                if announcement.chat_target.is_some() {
                    Some(self.chat.announce(&announcement).await)
                } else {
                    None
                }
            },
            async { self.social.announce(&announcement).await },
        );

        if let Some(result) = &chat_result {
            log_result(self.chat.platform(), event.id, result);
        }
        log_result(self.social.platform(), event.id, &social_result);
    }
}

fn log_result(platform: &str, score_id: i64, result: &NotificationResult) {
    match result {
        NotificationResult::Delivered { url } => {
            info!(platform, score_id, url = ?url, "announcement delivered");
        }
        NotificationResult::Failed { reason } => {
            error!(platform, score_id, %reason, "announcement failed");
        }
    }
}

/// Assemble the per-event payload both notifiers consume. The social
/// handle prefers the profile's Twitter link; the chat target needs a
/// Twitch entry carrying a platform user id.
pub fn build_announcement(event: &ScoreEvent, profile: &PlayerProfile) -> Announcement {
    let handle = profile
        .social("Twitter")
        .and_then(|social| social.link.as_deref())
        .and_then(twitter_handle)
        .unwrap_or_else(|| profile.name.clone());

    let chat_target = profile
        .social("Twitch")
        .and_then(|social| social.user_id.clone())
        .map(|user_id| ChatTarget { user_id });

    Announcement {
        score_id: event.id,
        percent: percent_label(event.accuracy),
        song: event.leaderboard.song.name.clone(),
        difficulty: event.leaderboard.difficulty.difficulty_name.clone(),
        replay_url: event.replay_url(),
        player_name: event.player.name.clone(),
        handle,
        chat_target,
    }
}

/// `https://twitter.com/someone` → `@someone`.
fn twitter_handle(link: &str) -> Option<String> {
    let handle = link.split('/').nth(3)?;
    if handle.is_empty() {
        return None;
    }

    Some(format!("@{}", handle))
}
