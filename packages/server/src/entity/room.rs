use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a battle room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Accepting players.
    Waiting,
    /// Battle running; no joins, submissions accepted.
    Ongoing,
    /// Terminal.
    Finished,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Ongoing => "ongoing",
            Self::Finished => "finished",
        }
    }
}

/// A member's recorded submission inside a room.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSubmission {
    pub username: String,
    pub submission_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// One row of the final ranking table.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRanking {
    pub rank: u32,
    pub username: String,
    pub grade: i32,
    pub execution_time: i64,
    pub memory_usage: i64,
    pub status: SubmissionStatus,
}

/// A multiplayer battle room. Members are tracked by username.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    /// Usernames in join order; the creator is first.
    pub players: Vec<String>,
    pub max_players: u32,
    pub created_by: String,
    pub is_private: bool,
    /// Argon2 hash; never serialized outward.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub problem_id: Option<Uuid>,
    pub status: RoomStatus,
    /// Usernames with a judge call in flight. Acts as the submission
    /// lock across await points.
    pub submitting: Vec<String>,
    pub submissions: Vec<RoomSubmission>,
    pub rankings: Vec<RoomRanking>,
    pub winner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Room {
    pub fn new(
        created_by: impl Into<String>,
        max_players: u32,
        is_private: bool,
        password_hash: Option<String>,
    ) -> Self {
        let created_by = created_by.into();
        Self {
            id: Uuid::new_v4(),
            players: vec![created_by.clone()],
            max_players,
            created_by,
            is_private,
            password_hash,
            problem_id: None,
            status: RoomStatus::Waiting,
            submitting: Vec::new(),
            submissions: Vec::new(),
            rankings: Vec::new(),
            winner: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn is_member(&self, username: &str) -> bool {
        self.players.iter().any(|p| p == username)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() as u32 >= self.max_players
    }

    pub fn has_submission_from(&self, username: &str) -> bool {
        self.submissions.iter().any(|s| s.username == username)
    }

    pub fn is_submitting(&self, username: &str) -> bool {
        self.submitting.iter().any(|s| s == username)
    }

    pub fn release_submitting(&mut self, username: &str) {
        self.submitting.retain(|s| s != username);
    }

    /// True once every current member has a recorded submission.
    pub fn all_submitted(&self) -> bool {
        !self.players.is_empty() && self.submissions.len() >= self.players.len()
    }
}
