pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::entity::leaderboard::LeaderboardEntry;
use crate::entity::matches::Match;
use crate::entity::player::PlayerProfile;
use crate::entity::problem::{Problem, RankBand, TestCase};
use crate::entity::room::Room;
use crate::entity::submission::Submission;

pub use memory::MemoryStore;

/// Error from a storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Target document of an update/delete does not exist.
    #[error("document not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Lookup and adjustment of player skill ratings.
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn insert(&self, profile: PlayerProfile) -> Result<(), StoreError>;

    async fn find(&self, player: Uuid) -> Result<Option<PlayerProfile>, StoreError>;

    /// Adds `delta` to the player's rating, clamping at zero. Returns the
    /// new rating.
    async fn apply_delta(&self, player: Uuid, delta: i32) -> Result<i32, StoreError>;
}

/// Read-side access to problems, their test cases, and rank bands.
#[async_trait]
pub trait ProblemCatalog: Send + Sync {
    async fn insert_band(&self, band: RankBand) -> Result<(), StoreError>;

    async fn insert_problem(
        &self,
        problem: Problem,
        test_cases: Vec<TestCase>,
    ) -> Result<(), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Problem>, StoreError>;

    async fn test_cases(&self, problem_id: Uuid) -> Result<Vec<TestCase>, StoreError>;

    /// Band covering the given rating, if any.
    async fn band_for(&self, rating: i32) -> Result<Option<RankBand>, StoreError>;

    /// Random open problem pitched at the named band.
    async fn pick_open_in_band(&self, band: &str) -> Result<Option<Problem>, StoreError>;

    /// Random open problem from the whole catalog.
    async fn pick_any_open(&self) -> Result<Option<Problem>, StoreError>;
}

/// Durable projection of match documents.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn insert(&self, doc: Match) -> Result<(), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Match>, StoreError>;

    /// Whole-document replace.
    async fn update(&self, doc: &Match) -> Result<(), StoreError>;

    /// Returns true if a document was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Durable projection of room documents.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn insert(&self, doc: Room) -> Result<(), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Room>, StoreError>;

    /// Whole-document replace.
    async fn update(&self, doc: &Room) -> Result<(), StoreError>;

    /// Returns true if a document was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<Room>, StoreError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, doc: Submission) -> Result<(), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    /// Compensating cleanup for submissions whose parent transition failed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Insert or update the (user, problem) row: attempts accumulate, the
    /// rest is replaced by the latest run.
    async fn upsert(&self, entry: LeaderboardEntry) -> Result<LeaderboardEntry, StoreError>;

    async fn list_for_problem(&self, problem_id: Uuid)
    -> Result<Vec<LeaderboardEntry>, StoreError>;
}
