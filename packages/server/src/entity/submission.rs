use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use serde::Serialize;
use uuid::Uuid;

/// A graded (or grading) submission. Belongs to a match, a room, or neither;
/// never both.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub problem_id: Uuid,
    pub match_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub language_id: i32,
    pub source_code: String,
    /// Test cases passed within the problem's time budget.
    pub grade: i32,
    /// Total execution time across test cases, milliseconds.
    pub execution_time: i64,
    /// Total memory across test cases, kilobytes.
    pub memory_usage: i64,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    /// Ordering key for winner decisions and rankings: higher grade first,
    /// then faster, then leaner. Ties compare equal so stable sorts keep
    /// submission order.
    pub fn ranking_key(&self) -> (i32, i64, i64) {
        (-self.grade, self.execution_time, self.memory_usage)
    }
}
