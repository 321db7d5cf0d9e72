use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A player as the rating collaborator sees them.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub id: Uuid,
    pub username: String,
    /// Skill rating; never negative.
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

impl PlayerProfile {
    pub fn new(username: impl Into<String>, rating: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            rating: rating.max(0),
            created_at: Utc::now(),
        }
    }
}
