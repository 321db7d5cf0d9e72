use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a ranked 1v1 match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Created at pairing time; waiting for both players to accept.
    Pending,
    /// Both players accepted; the battle is running.
    Ongoing,
    /// Terminal. Settled by submissions, rejection, or deadline.
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Which side of a match a player occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerSlot {
    One,
    Two,
}

/// A ranked 1v1 match over a single problem.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    /// Filled by the first accepting player.
    pub player1: Option<Uuid>,
    /// Filled by the second accepting player; filling it starts the match.
    pub player2: Option<Uuid>,
    pub problem_id: Uuid,
    pub player1_submission: Option<Uuid>,
    pub player2_submission: Option<Uuid>,
    pub winner: Option<Uuid>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn new(problem_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            player1: None,
            player2: None,
            problem_id,
            player1_submission: None,
            player2_submission: None,
            winner: None,
            status: MatchStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn slot_of(&self, player: Uuid) -> Option<PlayerSlot> {
        if self.player1 == Some(player) {
            Some(PlayerSlot::One)
        } else if self.player2 == Some(player) {
            Some(PlayerSlot::Two)
        } else {
            None
        }
    }

    pub fn is_participant(&self, player: Uuid) -> bool {
        self.slot_of(player).is_some()
    }

    pub fn opponent_of(&self, player: Uuid) -> Option<Uuid> {
        match self.slot_of(player)? {
            PlayerSlot::One => self.player2,
            PlayerSlot::Two => self.player1,
        }
    }

    pub fn submission_of(&self, slot: PlayerSlot) -> Option<Uuid> {
        match slot {
            PlayerSlot::One => self.player1_submission,
            PlayerSlot::Two => self.player2_submission,
        }
    }

    pub fn set_submission(&mut self, slot: PlayerSlot, submission_id: Uuid) {
        match slot {
            PlayerSlot::One => self.player1_submission = Some(submission_id),
            PlayerSlot::Two => self.player2_submission = Some(submission_id),
        }
    }

    pub fn both_submitted(&self) -> bool {
        self.player1_submission.is_some() && self.player2_submission.is_some()
    }
}
