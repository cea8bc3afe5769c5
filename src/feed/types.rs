use serde::Deserialize;

pub const REPLAY_URI_BASE: &str = "https://replay.beatleader.xyz/";

/// One decoded score submission from the realtime feed. This is the
/// subset of the feed document the pipeline consumes; everything else in
/// the payload is ignored. Never persisted — the event's lifecycle ends
/// when the dispatcher is done with it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreEvent {
    pub id: i64,

    #[serde(rename = "playerId")]
    pub player_id: String,

    /// Raw 0–1 ratio as submitted.
    pub accuracy: f64,

    #[serde(default)]
    pub timepost: i64,

    pub player: ScorePlayer,
    pub leaderboard: ScoreLeaderboard,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScorePlayer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreLeaderboard {
    pub song: ScoreSong,
    pub difficulty: ScoreDifficulty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreSong {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreDifficulty {
    #[serde(rename = "difficultyName")]
    pub difficulty_name: String,
}

impl ScoreEvent {
    pub fn replay_url(&self) -> String {
        format!("{}?scoreId={}", REPLAY_URI_BASE, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_feed_document() {
        let raw = crate::feed::tests::score_json(42, 0.727);
        let event: ScoreEvent = serde_json::from_str(&raw).unwrap();

        assert_eq!(event.id, 42);
        assert_eq!(event.player_id, "76561198000000000");
        assert_eq!(event.player.name, "tester");
        assert_eq!(event.leaderboard.song.name, "Time Files");
        assert_eq!(event.leaderboard.difficulty.difficulty_name, "Expert+");
        assert_eq!(event.replay_url(), "https://replay.beatleader.xyz/?scoreId=42");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = r#"{
            "id": 7,
            "playerId": "1",
            "accuracy": 0.5,
            "timepost": 1722470400,
            "modifiedScore": 912345,
            "player": { "id": "1", "name": "p", "rank": 100 },
            "leaderboard": {
                "song": { "name": "s", "hash": "abcd" },
                "difficulty": { "difficultyName": "Hard", "stars": 7.2 }
            }
        }"#;

        let event: ScoreEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.id, 7);
    }
}
