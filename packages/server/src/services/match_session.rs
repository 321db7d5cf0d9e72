use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::MatchmakingConfig;
use crate::entity::matches::{Match, MatchStatus, PlayerSlot};
use crate::entity::submission::Submission;
use crate::error::AppError;
use crate::gateway::connections::ConnectionId;
use crate::gateway::events::{
    CompetitorSubmissionPayload, FinishMatchPayload, MatchChatPayload, MatchEndedPayload,
    MatchSubmissionSummary, RejectMatchPayload, ServerEvent, StartMatchPayload,
};
use crate::gateway::{match_channel, PubSub};
use crate::judge::{grade_submission, JudgeClient};
use crate::services::scheduler::DeadlineScheduler;
use crate::store::{MatchStore, ProblemCatalog, RatingStore, SubmissionStore};

/// Live state of one match session.
///
/// The outer `submit_lock` serializes whole submission attempts, including the
/// judge round-trip, so the slow path never interleaves. Everything else takes
/// only the short-lived state lock.
#[derive(Clone)]
struct MatchHandle {
    state: Arc<Mutex<Match>>,
    submit_lock: Arc<Mutex<()>>,
}

/// Coordinates ranked 1v1 match sessions from pairing to settlement.
pub struct MatchCoordinator {
    sessions: DashMap<Uuid, MatchHandle>,
    matches: Arc<dyn MatchStore>,
    submissions: Arc<dyn SubmissionStore>,
    ratings: Arc<dyn RatingStore>,
    catalog: Arc<dyn ProblemCatalog>,
    judge: Arc<dyn JudgeClient>,
    pubsub: Arc<PubSub>,
    scheduler: DeadlineScheduler,
    match_duration: TimeDelta,
    rating_stake: i32,
}

impl MatchCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &MatchmakingConfig,
        matches: Arc<dyn MatchStore>,
        submissions: Arc<dyn SubmissionStore>,
        ratings: Arc<dyn RatingStore>,
        catalog: Arc<dyn ProblemCatalog>,
        judge: Arc<dyn JudgeClient>,
        pubsub: Arc<PubSub>,
        scheduler: DeadlineScheduler,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            matches,
            submissions,
            ratings,
            catalog,
            judge,
            pubsub,
            scheduler,
            match_duration: TimeDelta::seconds(config.match_duration_secs as i64),
            rating_stake: config.rating_stake,
        }
    }

    /// Opens a Pending session for a fresh pairing. Both slots stay empty
    /// until the players accept.
    pub async fn create_pending(&self, problem_id: Uuid) -> Result<Match, AppError> {
        let doc = Match::new(problem_id);
        self.matches.insert(doc.clone()).await?;
        self.sessions.insert(
            doc.id,
            MatchHandle {
                state: Arc::new(Mutex::new(doc.clone())),
                submit_lock: Arc::new(Mutex::new(())),
            },
        );
        Ok(doc)
    }

    fn handle(&self, match_id: Uuid) -> Result<MatchHandle, AppError> {
        self.sessions
            .get(&match_id)
            .map(|h| h.clone())
            .ok_or_else(|| AppError::NotFound("Match not found".into()))
    }

    /// Fills the caller's slot. The second accept flips the match to Ongoing,
    /// arms the deadline and broadcasts `start_match`.
    #[instrument(skip(self), fields(match_id = %match_id, player = %player_id))]
    pub async fn accept(self: &Arc<Self>, match_id: Uuid, player_id: Uuid) -> Result<(), AppError> {
        let handle = self.handle(match_id)?;
        let mut state = handle.state.lock().await;
        match state.status {
            MatchStatus::Pending => {}
            MatchStatus::Ongoing => {
                return Err(AppError::Conflict("Match has already started".into()));
            }
            MatchStatus::Completed => return Err(AppError::Conflict("Match is over".into())),
        }
        if state.is_participant(player_id) {
            return Err(AppError::Conflict("You already accepted this match".into()));
        }

        let snapshot = state.clone();
        if state.player1.is_none() {
            state.player1 = Some(player_id);
            if let Err(err) = self.matches.update(&state).await {
                *state = snapshot;
                return Err(err.into());
            }
            return Ok(());
        }

        let now = Utc::now();
        let deadline = now + self.match_duration;
        state.player2 = Some(player_id);
        state.status = MatchStatus::Ongoing;
        state.started_at = Some(now);
        if let Err(err) = self.matches.update(&state).await {
            *state = snapshot;
            return Err(err.into());
        }

        self.schedule_deadline(match_id, deadline);
        self.pubsub.publish(
            &match_channel(match_id),
            &ServerEvent::StartMatch(StartMatchPayload {
                match_id,
                room_id: match_id,
                deadline,
            }),
        );
        info!("match started");
        Ok(())
    }

    /// Tears the pairing down before it starts. Both players are told who
    /// rejected; the match document is deleted rather than kept as a loss.
    #[instrument(skip(self), fields(match_id = %match_id, player = %player_id))]
    pub async fn reject(&self, match_id: Uuid, player_id: Uuid) -> Result<(), AppError> {
        let handle = self.handle(match_id)?;
        let state = handle.state.lock().await;
        if state.status != MatchStatus::Pending {
            return Err(AppError::Conflict("Match has already started".into()));
        }
        self.matches.delete(match_id).await?;
        drop(state);

        self.sessions.remove(&match_id);
        self.scheduler.cancel(match_id);
        let channel = match_channel(match_id);
        self.pubsub.publish(
            &channel,
            &ServerEvent::RejectMatch(RejectMatchPayload {
                match_id,
                user_id: player_id,
            }),
        );
        self.pubsub.drop_channel(&channel);
        info!("match rejected");
        Ok(())
    }

    /// Grades the caller's solution and applies it to the match.
    ///
    /// The first submission notifies the opponent; the second settles the
    /// match. Room state is re-checked after the judge round-trip, and a
    /// submission whose transition can no longer happen is deleted again.
    #[instrument(skip(self, source_code), fields(match_id = %match_id, player = %user_id))]
    pub async fn submit(
        self: &Arc<Self>,
        match_id: Uuid,
        user_id: Uuid,
        username: &str,
        connection: ConnectionId,
        language_id: i32,
        source_code: String,
    ) -> Result<Submission, AppError> {
        let handle = self.handle(match_id)?;
        let _serialized = handle.submit_lock.lock().await;

        let (problem_id, slot) = {
            let state = handle.state.lock().await;
            match state.status {
                MatchStatus::Pending => {
                    return Err(AppError::Conflict("Match has not started yet".into()));
                }
                MatchStatus::Completed => {
                    return Err(AppError::Conflict("Match is already settled".into()));
                }
                MatchStatus::Ongoing => {}
            }
            let slot = state
                .slot_of(user_id)
                .ok_or_else(|| AppError::PermissionDenied("You are not in this match".into()))?;
            if state.submission_of(slot).is_some() {
                return Err(AppError::Conflict(
                    "You already submitted for this match".into(),
                ));
            }
            (state.problem_id, slot)
        };

        let problem = self
            .catalog
            .find(problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;
        let cases = self.catalog.test_cases(problem_id).await?;
        let run = grade_submission(
            self.judge.as_ref(),
            &problem,
            &cases,
            language_id,
            &source_code,
        )
        .await;

        let submission = Submission {
            id: Uuid::new_v4(),
            user_id,
            username: username.to_string(),
            problem_id,
            match_id: Some(match_id),
            room_id: None,
            language_id,
            source_code,
            grade: run.grade,
            execution_time: run.execution_time,
            memory_usage: run.memory_usage,
            status: run.status,
            submitted_at: Utc::now(),
        };
        self.submissions.insert(submission.clone()).await?;

        let mut state = handle.state.lock().await;
        if state.status != MatchStatus::Ongoing {
            let _ = self.submissions.delete(submission.id).await;
            return Err(AppError::Conflict("Match is already settled".into()));
        }
        let snapshot = state.clone();

        let opponent_submission = match slot {
            PlayerSlot::One => state.player2_submission,
            PlayerSlot::Two => state.player1_submission,
        };
        let Some(opponent_submission_id) = opponent_submission else {
            state.set_submission(slot, submission.id);
            if let Err(err) = self.matches.update(&state).await {
                *state = snapshot;
                let _ = self.submissions.delete(submission.id).await;
                return Err(err.into());
            }
            self.pubsub.publish_except(
                &match_channel(match_id),
                connection,
                &ServerEvent::CompetitorSubmission(CompetitorSubmissionPayload {
                    match_id,
                    username: username.to_string(),
                }),
            );
            return Ok(submission);
        };

        let opponent_sub = match self.submissions.find(opponent_submission_id).await {
            Ok(Some(sub)) => sub,
            Ok(None) => {
                let _ = self.submissions.delete(submission.id).await;
                return Err(AppError::Internal(
                    "opponent submission record missing".into(),
                ));
            }
            Err(err) => {
                let _ = self.submissions.delete(submission.id).await;
                return Err(err.into());
            }
        };

        let (p1_sub, p2_sub) = match slot {
            PlayerSlot::One => (&submission, &opponent_sub),
            PlayerSlot::Two => (&opponent_sub, &submission),
        };
        let winner = decide_winner(p1_sub, p2_sub).map(|s| s.user_id);
        let results = vec![summary_of(p1_sub), summary_of(p2_sub)];

        state.set_submission(slot, submission.id);
        state.winner = winner;
        state.status = MatchStatus::Completed;
        state.ended_at = Some(Utc::now());
        if let Err(err) = self.matches.update(&state).await {
            *state = snapshot;
            let _ = self.submissions.delete(submission.id).await;
            return Err(err.into());
        }
        drop(state);

        self.scheduler.cancel(match_id);
        self.sessions.remove(&match_id);
        if let Some(winner_id) = winner {
            let loser_id = if winner_id == p1_sub.user_id {
                p2_sub.user_id
            } else {
                p1_sub.user_id
            };
            self.transfer_rating(winner_id, loser_id).await;
        }

        let channel = match_channel(match_id);
        self.pubsub.publish(
            &channel,
            &ServerEvent::FinishMatch(FinishMatchPayload {
                match_id,
                winner,
                results,
            }),
        );
        self.pubsub.drop_channel(&channel);
        info!(winner = ?winner, "match settled");
        Ok(submission)
    }

    /// Relays a chat line to everyone else in the match channel.
    pub async fn chat(
        &self,
        match_id: Uuid,
        username: &str,
        connection: ConnectionId,
        message: String,
    ) -> Result<(), AppError> {
        self.handle(match_id)?;
        self.pubsub.publish_except(
            &match_channel(match_id),
            connection,
            &ServerEvent::ReceiveMessageMatch(MatchChatPayload {
                match_id,
                username: username.to_string(),
                message,
            }),
        );
        Ok(())
    }

    /// Deadline expiry: the match completes with no winner and no rating
    /// movement. A match that already settled is left alone.
    pub async fn handle_deadline(&self, match_id: Uuid) {
        let Some(handle) = self.sessions.get(&match_id).map(|h| h.clone()) else {
            return;
        };
        let mut state = handle.state.lock().await;
        if state.status != MatchStatus::Ongoing {
            return;
        }
        state.status = MatchStatus::Completed;
        state.ended_at = Some(Utc::now());
        if let Err(err) = self.matches.update(&state).await {
            warn!(%match_id, error = %err, "failed to persist match timeout");
        }
        drop(state);

        self.sessions.remove(&match_id);
        let channel = match_channel(match_id);
        self.pubsub.publish(
            &channel,
            &ServerEvent::MatchEnded(MatchEndedPayload {
                match_id,
                reason: "timeout",
            }),
        );
        self.pubsub.drop_channel(&channel);
        info!(%match_id, "match ended by timeout");
    }

    fn schedule_deadline(self: &Arc<Self>, match_id: Uuid, fire_at: DateTime<Utc>) {
        let coordinator = Arc::clone(self);
        self.scheduler.schedule(match_id, fire_at, move || async move {
            coordinator.handle_deadline(match_id).await;
        });
    }

    /// The stake moves from loser to winner after the terminal state is
    /// durable. A failed adjustment is logged, not unwound.
    async fn transfer_rating(&self, winner: Uuid, loser: Uuid) {
        if let Err(err) = self.ratings.apply_delta(winner, self.rating_stake).await {
            warn!(player = %winner, error = %err, "failed to credit winner rating");
        }
        if let Err(err) = self.ratings.apply_delta(loser, -self.rating_stake).await {
            warn!(player = %loser, error = %err, "failed to debit loser rating");
        }
    }

    #[cfg(test)]
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}

/// Winner of a settled match, if any.
///
/// An Accepted run always beats a rejected one regardless of metrics.
/// Between two Accepted runs the higher grade wins, then faster, then
/// leaner, then whoever submitted first. When neither run was Accepted the
/// match is a draw.
pub fn decide_winner<'a>(p1: &'a Submission, p2: &'a Submission) -> Option<&'a Submission> {
    match (p1.status.is_accepted(), p2.status.is_accepted()) {
        (false, false) => None,
        (true, false) => Some(p1),
        (false, true) => Some(p2),
        (true, true) => {
            let ord = p1
                .ranking_key()
                .cmp(&p2.ranking_key())
                .then_with(|| p1.submitted_at.cmp(&p2.submitted_at));
            match ord {
                Ordering::Greater => Some(p2),
                _ => Some(p1),
            }
        }
    }
}

fn summary_of(sub: &Submission) -> MatchSubmissionSummary {
    MatchSubmissionSummary {
        user_id: sub.user_id,
        username: sub.username.clone(),
        grade: sub.grade,
        execution_time: sub.execution_time,
        memory_usage: sub.memory_usage,
        status: sub.status,
    }
}
