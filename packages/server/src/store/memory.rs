use async_trait::async_trait;
use dashmap::DashMap;
use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::entity::leaderboard::LeaderboardEntry;
use crate::entity::matches::Match;
use crate::entity::player::PlayerProfile;
use crate::entity::problem::{Problem, RankBand, TestCase};
use crate::entity::room::Room;
use crate::entity::submission::Submission;

use super::{
    LeaderboardStore, MatchStore, ProblemCatalog, RatingStore, RoomStore, StoreError,
    SubmissionStore,
};

/// In-memory adapter backing every storage port. This is the adapter the
/// binary wires; persistent backends implement the same traits elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    players: DashMap<Uuid, PlayerProfile>,
    bands: DashMap<String, RankBand>,
    problems: DashMap<Uuid, Problem>,
    test_cases: DashMap<Uuid, Vec<TestCase>>,
    matches: DashMap<Uuid, Match>,
    rooms: DashMap<Uuid, Room>,
    submissions: DashMap<Uuid, Submission>,
    leaderboard: DashMap<(Uuid, Uuid), LeaderboardEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn insert(&self, profile: PlayerProfile) -> Result<(), StoreError> {
        self.players.insert(profile.id, profile);
        Ok(())
    }

    async fn find(&self, player: Uuid) -> Result<Option<PlayerProfile>, StoreError> {
        Ok(self.players.get(&player).map(|p| p.clone()))
    }

    async fn apply_delta(&self, player: Uuid, delta: i32) -> Result<i32, StoreError> {
        let mut profile = self.players.get_mut(&player).ok_or(StoreError::NotFound)?;
        profile.rating = (profile.rating + delta).max(0);
        Ok(profile.rating)
    }
}

#[async_trait]
impl ProblemCatalog for MemoryStore {
    async fn insert_band(&self, band: RankBand) -> Result<(), StoreError> {
        self.bands.insert(band.name.clone(), band);
        Ok(())
    }

    async fn insert_problem(
        &self,
        problem: Problem,
        test_cases: Vec<TestCase>,
    ) -> Result<(), StoreError> {
        self.test_cases.insert(problem.id, test_cases);
        self.problems.insert(problem.id, problem);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Problem>, StoreError> {
        Ok(self.problems.get(&id).map(|p| p.clone()))
    }

    async fn test_cases(&self, problem_id: Uuid) -> Result<Vec<TestCase>, StoreError> {
        Ok(self
            .test_cases
            .get(&problem_id)
            .map(|t| t.clone())
            .unwrap_or_default())
    }

    async fn band_for(&self, rating: i32) -> Result<Option<RankBand>, StoreError> {
        Ok(self
            .bands
            .iter()
            .find(|b| b.covers(rating))
            .map(|b| b.clone()))
    }

    async fn pick_open_in_band(&self, band: &str) -> Result<Option<Problem>, StoreError> {
        let candidates: Vec<Problem> = self
            .problems
            .iter()
            .filter(|p| p.band == band && p.is_open())
            .map(|p| p.clone())
            .collect();
        Ok(candidates.choose(&mut rand::rng()).cloned())
    }

    async fn pick_any_open(&self) -> Result<Option<Problem>, StoreError> {
        let candidates: Vec<Problem> = self
            .problems
            .iter()
            .filter(|p| p.is_open())
            .map(|p| p.clone())
            .collect();
        Ok(candidates.choose(&mut rand::rng()).cloned())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn insert(&self, doc: Match) -> Result<(), StoreError> {
        self.matches.insert(doc.id, doc);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Match>, StoreError> {
        Ok(self.matches.get(&id).map(|m| m.clone()))
    }

    async fn update(&self, doc: &Match) -> Result<(), StoreError> {
        match self.matches.get_mut(&doc.id) {
            Some(mut stored) => {
                *stored = doc.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.matches.remove(&id).is_some())
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn insert(&self, doc: Room) -> Result<(), StoreError> {
        self.rooms.insert(doc.id, doc);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(&id).map(|r| r.clone()))
    }

    async fn update(&self, doc: &Room) -> Result<(), StoreError> {
        match self.rooms.get_mut(&doc.id) {
            Some(mut stored) => {
                *stored = doc.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.rooms.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.rooms.iter().map(|r| r.clone()).collect())
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert(&self, doc: Submission) -> Result<(), StoreError> {
        self.submissions.insert(doc.id, doc);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.get(&id).map(|s| s.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.submissions.remove(&id).is_some())
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStore {
    async fn upsert(&self, mut entry: LeaderboardEntry) -> Result<LeaderboardEntry, StoreError> {
        let key = (entry.user_id, entry.problem_id);
        if let Some(existing) = self.leaderboard.get(&key) {
            entry.id = existing.id;
            entry.attempts = existing.attempts + 1;
        }
        self.leaderboard.insert(key, entry.clone());
        Ok(entry)
    }

    async fn list_for_problem(
        &self,
        problem_id: Uuid,
    ) -> Result<Vec<LeaderboardEntry>, StoreError> {
        Ok(self
            .leaderboard
            .iter()
            .filter(|e| e.problem_id == problem_id)
            .map(|e| e.clone())
            .collect())
    }
}
