use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Best-effort per-problem leaderboard row, upserted when a room battle
/// finishes. Keyed by (user, problem); attempts accumulate, the rest is
/// replaced by the latest run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub problem_id: Uuid,
    pub score: i32,
    pub execution_time: i64,
    pub memory_usage: i64,
    pub language_id: i32,
    pub attempts: u32,
    pub updated_at: DateTime<Utc>,
}
