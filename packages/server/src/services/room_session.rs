use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::RoomsConfig;
use crate::entity::leaderboard::LeaderboardEntry;
use crate::entity::room::{Room, RoomRanking, RoomStatus, RoomSubmission};
use crate::entity::submission::Submission;
use crate::error::AppError;
use crate::gateway::connections::ConnectionId;
use crate::gateway::events::{
    BattleFinishedPayload, BattleStartedPayload, BattleTimeoutPayload, RoomDeletedPayload,
    RoomMemberPayload, ServerEvent, SubmissionUpdatePayload,
};
use crate::gateway::{room_channel, PubSub, LOBBY_CHANNEL};
use crate::judge::{grade_submission, GradedRun, JudgeClient};
use crate::models::room::{
    validate_max_players, validate_room_password, CreateRoomRequest, MIN_ROOM_PLAYERS,
};
use crate::services::scheduler::DeadlineScheduler;
use crate::store::{LeaderboardStore, ProblemCatalog, RoomStore, SubmissionStore};
use crate::utils::hash;

/// What `leave` did with the room.
#[derive(Clone, Debug)]
pub enum LeaveOutcome {
    /// The player left; the room lives on.
    Left(Room),
    /// The room was deleted because the creator left or it became empty.
    Deleted,
}

/// Coordinates multiplayer battle rooms from creation to the final rankings.
///
/// Each room is guarded by its own async mutex. The `submitting` list on the
/// room document doubles as a cross-await lock: it is acquired and flushed
/// before the judge round-trip and always released afterwards.
pub struct RoomCoordinator {
    sessions: DashMap<Uuid, Arc<Mutex<Room>>>,
    rooms: Arc<dyn RoomStore>,
    submissions: Arc<dyn SubmissionStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
    catalog: Arc<dyn ProblemCatalog>,
    judge: Arc<dyn JudgeClient>,
    pubsub: Arc<PubSub>,
    scheduler: DeadlineScheduler,
    default_max_players: u32,
    max_players_limit: u32,
}

impl RoomCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &RoomsConfig,
        rooms: Arc<dyn RoomStore>,
        submissions: Arc<dyn SubmissionStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
        catalog: Arc<dyn ProblemCatalog>,
        judge: Arc<dyn JudgeClient>,
        pubsub: Arc<PubSub>,
        scheduler: DeadlineScheduler,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            rooms,
            submissions,
            leaderboard,
            catalog,
            judge,
            pubsub,
            scheduler,
            default_max_players: config.default_max_players,
            max_players_limit: config.max_players_limit,
        }
    }

    fn handle(&self, room_id: Uuid) -> Result<Arc<Mutex<Room>>, AppError> {
        self.sessions
            .get(&room_id)
            .map(|h| h.clone())
            .ok_or_else(|| AppError::NotFound("Room not found".into()))
    }

    /// Creates a room with the caller as first member and announces it to
    /// the lobby.
    #[instrument(skip(self, request), fields(username = %username))]
    pub async fn create(
        &self,
        username: &str,
        connection: ConnectionId,
        request: CreateRoomRequest,
    ) -> Result<Room, AppError> {
        let max_players = request.max_players.unwrap_or(self.default_max_players);
        validate_max_players(max_players, self.max_players_limit)?;
        validate_room_password(request.is_private, request.password.as_deref())?;

        let password_hash = match (request.is_private, request.password.as_deref()) {
            (true, Some(password)) => Some(
                hash::hash_password(password)
                    .map_err(|err| AppError::Internal(format!("failed to hash password: {err}")))?,
            ),
            _ => None,
        };

        let room = Room::new(username, max_players, request.is_private, password_hash);
        self.rooms.insert(room.clone()).await?;
        self.sessions
            .insert(room.id, Arc::new(Mutex::new(room.clone())));

        self.pubsub.subscribe(connection, &room_channel(room.id));
        self.pubsub
            .publish(LOBBY_CHANNEL, &ServerEvent::room_list_created(room.clone()));
        info!(room = %room.id, private = room.is_private, "room created");
        Ok(room)
    }

    /// Adds the caller to a waiting room. Rejoining a room you are already
    /// in only restores the channel subscription.
    #[instrument(skip(self, password), fields(room = %room_id, username = %username))]
    pub async fn join(
        &self,
        room_id: Uuid,
        username: &str,
        connection: ConnectionId,
        password: Option<String>,
    ) -> Result<Room, AppError> {
        let handle = self.handle(room_id)?;
        let mut room = handle.lock().await;

        if room.is_member(username) {
            self.pubsub.subscribe(connection, &room_channel(room_id));
            return Ok(room.clone());
        }
        if room.status != RoomStatus::Waiting {
            return Err(AppError::Conflict("Room is not accepting players".into()));
        }
        if room.is_private {
            let Some(stored) = room.password_hash.as_deref() else {
                return Err(AppError::Internal("private room without password hash".into()));
            };
            let presented = password.as_deref().unwrap_or("");
            let matches = hash::verify_password(presented, stored)
                .map_err(|err| AppError::Internal(format!("failed to verify password: {err}")))?;
            if !matches {
                return Err(AppError::PermissionDenied("Incorrect room password".into()));
            }
        }
        if room.is_full() {
            return Err(AppError::Conflict("Room is full".into()));
        }

        let snapshot = room.clone();
        room.players.push(username.to_string());
        if let Err(err) = self.rooms.update(&room).await {
            *room = snapshot;
            return Err(err.into());
        }
        let joined = room.clone();
        drop(room);

        self.pubsub.subscribe(connection, &room_channel(room_id));
        self.pubsub.publish_except(
            &room_channel(room_id),
            connection,
            &ServerEvent::PlayerJoined(RoomMemberPayload {
                room: joined.clone(),
                username: username.to_string(),
            }),
        );
        self.pubsub
            .publish(LOBBY_CHANNEL, &ServerEvent::room_list_updated(joined.clone()));
        info!(players = joined.players.len(), "player joined room");
        Ok(joined)
    }

    /// Removes the caller from the room. The room is deleted outright when
    /// the creator leaves or nobody remains.
    #[instrument(skip(self), fields(room = %room_id, username = %username))]
    pub async fn leave(
        &self,
        room_id: Uuid,
        username: &str,
        connection: Option<ConnectionId>,
    ) -> Result<LeaveOutcome, AppError> {
        let handle = self.handle(room_id)?;
        let mut room = handle.lock().await;
        if !room.is_member(username) {
            return Err(AppError::Validation("You are not in this room".into()));
        }

        let snapshot = room.clone();
        room.players.retain(|p| p != username);
        room.release_submitting(username);

        if room.players.is_empty() || room.created_by == username {
            if let Err(err) = self.rooms.delete(room_id).await {
                *room = snapshot;
                return Err(err.into());
            }
            drop(room);

            self.sessions.remove(&room_id);
            self.scheduler.cancel(room_id);
            let channel = room_channel(room_id);
            let deleted = ServerEvent::RoomDeleted(RoomDeletedPayload { room_id });
            match connection {
                Some(conn) => self.pubsub.publish_except(&channel, conn, &deleted),
                None => self.pubsub.publish(&channel, &deleted),
            }
            self.pubsub.drop_channel(&channel);
            self.pubsub
                .publish(LOBBY_CHANNEL, &ServerEvent::room_list_deleted(room_id));
            info!("room deleted");
            return Ok(LeaveOutcome::Deleted);
        }

        if let Err(err) = self.rooms.update(&room).await {
            *room = snapshot;
            return Err(err.into());
        }
        let remaining = room.clone();
        drop(room);

        if let Some(conn) = connection {
            self.pubsub.unsubscribe(conn, &room_channel(room_id));
        }
        self.pubsub.publish(
            &room_channel(room_id),
            &ServerEvent::PlayerLeft(RoomMemberPayload {
                room: remaining.clone(),
                username: username.to_string(),
            }),
        );
        self.pubsub
            .publish(LOBBY_CHANNEL, &ServerEvent::room_list_updated(remaining.clone()));
        info!(players = remaining.players.len(), "player left room");
        Ok(LeaveOutcome::Left(remaining))
    }

    /// Starts the battle on a random open problem. Creator only, and at
    /// least two players must be present.
    #[instrument(skip(self), fields(room = %room_id, username = %username))]
    pub async fn start(self: &Arc<Self>, room_id: Uuid, username: &str) -> Result<(), AppError> {
        let handle = self.handle(room_id)?;
        let mut room = handle.lock().await;
        if room.created_by != username {
            return Err(AppError::PermissionDenied(
                "Only the room creator can start the battle".into(),
            ));
        }
        if room.status != RoomStatus::Waiting {
            return Err(AppError::Conflict("Battle has already started".into()));
        }
        if (room.players.len() as u32) < MIN_ROOM_PLAYERS {
            return Err(AppError::Validation(
                "Need at least 2 players to start".into(),
            ));
        }

        let problem = self
            .catalog
            .pick_any_open()
            .await?
            .ok_or_else(|| AppError::NotFound("No open problems available".into()))?;

        let snapshot = room.clone();
        let now = Utc::now();
        let deadline = now + TimeDelta::milliseconds(problem.time_budget_ms);
        room.status = RoomStatus::Ongoing;
        room.problem_id = Some(problem.id);
        room.started_at = Some(now);
        if let Err(err) = self.rooms.update(&room).await {
            *room = snapshot;
            return Err(err.into());
        }
        let started = room.clone();
        drop(room);

        self.schedule_deadline(room_id, deadline);
        self.pubsub.publish(
            &room_channel(room_id),
            &ServerEvent::BattleStarted(BattleStartedPayload {
                room: started.clone(),
                problem_id: problem.id,
                battle_url: format!("/battle?matchId={room_id}"),
                deadline,
            }),
        );
        self.pubsub
            .publish(LOBBY_CHANNEL, &ServerEvent::room_list_updated(started));
        info!(problem = %problem.id, "battle started");
        Ok(())
    }

    /// Grades the caller's solution and folds it into the battle.
    ///
    /// The submitting slot is taken under the room lock and flushed before
    /// the judge round-trip, then always released when the caller returns to
    /// apply the result. The last submission in settles the battle.
    #[instrument(skip(self, source_code), fields(room = %room_id, username = %username))]
    pub async fn submit(
        self: &Arc<Self>,
        room_id: Uuid,
        user_id: Uuid,
        username: &str,
        language_id: i32,
        source_code: String,
    ) -> Result<Submission, AppError> {
        let handle = self.handle(room_id)?;

        let problem_id = {
            let mut room = handle.lock().await;
            if room.status != RoomStatus::Ongoing {
                return Err(AppError::Conflict("Battle is not running".into()));
            }
            if !room.is_member(username) {
                return Err(AppError::PermissionDenied("You are not in this room".into()));
            }
            if room.has_submission_from(username) {
                return Err(AppError::Conflict(
                    "You already submitted for this battle".into(),
                ));
            }
            if room.is_submitting(username) {
                return Err(AppError::Conflict(
                    "Your submission is already being graded".into(),
                ));
            }
            let problem_id = room
                .problem_id
                .ok_or_else(|| AppError::Internal("ongoing room without a problem".into()))?;
            room.submitting.push(username.to_string());
            if let Err(err) = self.rooms.update(&room).await {
                room.release_submitting(username);
                return Err(err.into());
            }
            problem_id
        };

        let run = match self.grade(problem_id, language_id, &source_code).await {
            Ok(run) => run,
            Err(err) => {
                self.abort_submission(&handle, username).await;
                return Err(err);
            }
        };

        let submission = Submission {
            id: Uuid::new_v4(),
            user_id,
            username: username.to_string(),
            problem_id,
            match_id: None,
            room_id: Some(room_id),
            language_id,
            source_code,
            grade: run.grade,
            execution_time: run.execution_time,
            memory_usage: run.memory_usage,
            status: run.status,
            submitted_at: Utc::now(),
        };
        if let Err(err) = self.submissions.insert(submission.clone()).await {
            self.abort_submission(&handle, username).await;
            return Err(err.into());
        }

        let mut room = handle.lock().await;
        room.release_submitting(username);
        if room.status != RoomStatus::Ongoing {
            let _ = self.submissions.delete(submission.id).await;
            let _ = self.rooms.update(&room).await;
            return Err(AppError::Conflict("Battle already finished".into()));
        }
        if !room.is_member(username) {
            let _ = self.submissions.delete(submission.id).await;
            let _ = self.rooms.update(&room).await;
            return Err(AppError::Conflict("You are no longer in this room".into()));
        }

        let snapshot = room.clone();
        room.submissions.push(RoomSubmission {
            username: username.to_string(),
            submission_id: submission.id,
            submitted_at: submission.submitted_at,
        });

        if room.all_submitted() {
            let subs = match self.load_room_submissions(&room).await {
                Ok(subs) => subs,
                Err(err) => {
                    *room = snapshot;
                    let _ = self.submissions.delete(submission.id).await;
                    let _ = self.rooms.update(&room).await;
                    return Err(err);
                }
            };
            let (rankings, winner) = compute_rankings(&subs);
            room.rankings = rankings;
            room.winner = winner;
            room.status = RoomStatus::Finished;
            room.ended_at = Some(Utc::now());
            if let Err(err) = self.rooms.update(&room).await {
                *room = snapshot;
                let _ = self.submissions.delete(submission.id).await;
                let _ = self.rooms.update(&room).await;
                return Err(err.into());
            }
            let finished = room.clone();
            drop(room);

            self.scheduler.cancel(room_id);
            self.record_leaderboard(&subs).await;
            self.pubsub.publish(
                &room_channel(room_id),
                &ServerEvent::BattleFinished(BattleFinishedPayload {
                    room: finished.clone(),
                    rankings: finished.rankings.clone(),
                    winner: finished.winner.clone(),
                    redirect_url: format!("/rooms/{room_id}/results"),
                }),
            );
            self.pubsub
                .publish(LOBBY_CHANNEL, &ServerEvent::room_list_updated(finished));
            info!("battle finished");
        } else {
            if let Err(err) = self.rooms.update(&room).await {
                *room = snapshot;
                let _ = self.submissions.delete(submission.id).await;
                let _ = self.rooms.update(&room).await;
                return Err(err.into());
            }
            let current = room.clone();
            drop(room);

            self.pubsub.publish(
                &room_channel(room_id),
                &ServerEvent::SubmissionUpdate(SubmissionUpdatePayload {
                    room_id,
                    username: username.to_string(),
                    submitted: current.submissions.len(),
                    expected: current.players.len(),
                }),
            );
        }

        Ok(submission)
    }

    /// Deadline expiry: the battle finishes with whatever submissions are in.
    /// Players still judging get their result rejected on return.
    pub async fn handle_deadline(&self, room_id: Uuid) {
        let Some(handle) = self.sessions.get(&room_id).map(|h| h.clone()) else {
            return;
        };
        let mut room = handle.lock().await;
        if room.status != RoomStatus::Ongoing {
            return;
        }
        room.status = RoomStatus::Finished;
        room.ended_at = Some(Utc::now());
        if let Err(err) = self.rooms.update(&room).await {
            warn!(%room_id, error = %err, "failed to persist battle timeout");
        }
        let finished = room.clone();
        drop(room);

        self.pubsub.publish(
            &room_channel(room_id),
            &ServerEvent::BattleTimeout(BattleTimeoutPayload { room_id }),
        );
        self.pubsub
            .publish(LOBBY_CHANNEL, &ServerEvent::room_list_updated(finished));
        info!(%room_id, "battle ended by timeout");
    }

    fn schedule_deadline(self: &Arc<Self>, room_id: Uuid, fire_at: DateTime<Utc>) {
        let coordinator = Arc::clone(self);
        self.scheduler.schedule(room_id, fire_at, move || async move {
            coordinator.handle_deadline(room_id).await;
        });
    }

    async fn grade(
        &self,
        problem_id: Uuid,
        language_id: i32,
        source_code: &str,
    ) -> Result<GradedRun, AppError> {
        let problem = self
            .catalog
            .find(problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;
        let cases = self.catalog.test_cases(problem_id).await?;
        Ok(grade_submission(self.judge.as_ref(), &problem, &cases, language_id, source_code).await)
    }

    /// Releases the submitting slot after a failed attempt.
    async fn abort_submission(&self, handle: &Arc<Mutex<Room>>, username: &str) {
        let mut room = handle.lock().await;
        room.release_submitting(username);
        if let Err(err) = self.rooms.update(&room).await {
            warn!(room = %room.id, error = %err, "failed to persist submitting release");
        }
    }

    async fn load_room_submissions(&self, room: &Room) -> Result<Vec<Submission>, AppError> {
        let mut subs = Vec::with_capacity(room.submissions.len());
        for entry in &room.submissions {
            match self.submissions.find(entry.submission_id).await? {
                Some(sub) => subs.push(sub),
                None => {
                    return Err(AppError::Internal("submission record missing".into()));
                }
            }
        }
        Ok(subs)
    }

    /// Best-effort leaderboard rollup after a battle settles.
    async fn record_leaderboard(&self, subs: &[Submission]) {
        for sub in subs {
            let entry = LeaderboardEntry {
                id: Uuid::new_v4(),
                user_id: sub.user_id,
                username: sub.username.clone(),
                problem_id: sub.problem_id,
                score: sub.grade,
                execution_time: sub.execution_time,
                memory_usage: sub.memory_usage,
                language_id: sub.language_id,
                attempts: 1,
                updated_at: Utc::now(),
            };
            if let Err(err) = self.leaderboard.upsert(entry).await {
                warn!(player = %sub.username, error = %err, "failed to record leaderboard entry");
            }
        }
    }

    #[cfg(test)]
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }
}

/// Final standings for a settled battle.
///
/// Accepted runs rank above everything else, then higher grade, faster,
/// leaner. The sort is stable so full ties keep submission order. The winner
/// is the top row, but only when that run was Accepted.
pub fn compute_rankings(subs: &[Submission]) -> (Vec<RoomRanking>, Option<String>) {
    let mut ordered: Vec<&Submission> = subs.iter().collect();
    ordered.sort_by_key(|s| (!s.status.is_accepted(), s.ranking_key()));

    let rankings = ordered
        .iter()
        .enumerate()
        .map(|(i, s)| RoomRanking {
            rank: (i + 1) as u32,
            username: s.username.clone(),
            grade: s.grade,
            execution_time: s.execution_time,
            memory_usage: s.memory_usage,
            status: s.status,
        })
        .collect();
    let winner = ordered
        .first()
        .filter(|s| s.status.is_accepted())
        .map(|s| s.username.clone());
    (rankings, winner)
}
