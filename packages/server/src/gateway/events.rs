//! Wire vocabulary for the websocket gateway.
//!
//! Every frame in either direction is a JSON envelope `{"event": ..., "data": ...}`.
//! Inbound frames deserialize into [`ClientEvent`]; everything the server pushes
//! is a [`ServerEvent`]. Payload fields use camelCase on the wire.

use chrono::{DateTime, Utc};
use common::SubmissionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::room::{Room, RoomRanking};
use crate::entity::submission::Submission;
use crate::error::{AppError, ErrorBody};
use crate::models::matchmaking::{
    AcceptMatchRequest, MatchChatRequest, RejectMatchRequest, SubmitMatchRequest,
};
use crate::models::room::{
    CreateRoomRequest, JoinRoomRequest, LeaveRoomRequest, StartBattleRequest, SubmitCodeRequest,
};

/// Everything a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "find_match")]
    FindMatch,
    #[serde(rename = "leave_waiting")]
    LeaveWaiting,
    #[serde(rename = "accept_match")]
    AcceptMatch(AcceptMatchRequest),
    #[serde(rename = "reject_match")]
    RejectMatch(RejectMatchRequest),
    #[serde(rename = "submit_match")]
    SubmitMatch(SubmitMatchRequest),
    #[serde(rename = "send_message_match")]
    SendMessageMatch(MatchChatRequest),
    #[serde(rename = "create-room")]
    CreateRoom(CreateRoomRequest),
    #[serde(rename = "join-room")]
    JoinRoom(JoinRoomRequest),
    #[serde(rename = "leave-room")]
    LeaveRoom(LeaveRoomRequest),
    #[serde(rename = "start_battle")]
    StartBattle(StartBattleRequest),
    #[serde(rename = "submit_code")]
    SubmitCode(SubmitCodeRequest),
    #[serde(rename = "disconnect")]
    Disconnect,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::FindMatch => "find_match",
            ClientEvent::LeaveWaiting => "leave_waiting",
            ClientEvent::AcceptMatch(_) => "accept_match",
            ClientEvent::RejectMatch(_) => "reject_match",
            ClientEvent::SubmitMatch(_) => "submit_match",
            ClientEvent::SendMessageMatch(_) => "send_message_match",
            ClientEvent::CreateRoom(_) => "create-room",
            ClientEvent::JoinRoom(_) => "join-room",
            ClientEvent::LeaveRoom(_) => "leave-room",
            ClientEvent::StartBattle(_) => "start_battle",
            ClientEvent::SubmitCode(_) => "submit_code",
            ClientEvent::Disconnect => "disconnect",
        }
    }

    /// Submission events get their failures reported as `submission_error`
    /// rather than the generic `error` envelope.
    pub fn is_submission(&self) -> bool {
        matches!(
            self,
            ClientEvent::SubmitMatch(_) | ClientEvent::SubmitCode(_)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundCompetitorPayload {
    pub room_id: Uuid,
    pub match_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMatchPayload {
    pub match_id: Uuid,
    pub room_id: Uuid,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSubmissionPayload {
    pub match_id: Uuid,
    pub username: String,
}

/// Per-player result line included in `finish_match`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSubmissionSummary {
    pub user_id: Uuid,
    pub username: String,
    pub grade: i32,
    pub execution_time: i64,
    pub memory_usage: i64,
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishMatchPayload {
    pub match_id: Uuid,
    pub winner: Option<Uuid>,
    pub results: Vec<MatchSubmissionSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEndedPayload {
    pub match_id: Uuid,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectMatchPayload {
    pub match_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchChatPayload {
    pub match_id: Uuid,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomPayload {
    pub room: Room,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomMemberPayload {
    pub room: Room,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeletedPayload {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleStartedPayload {
    pub room: Room,
    pub problem_id: Uuid,
    pub battle_url: String,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdatePayload {
    pub room_id: Uuid,
    pub username: String,
    pub submitted: usize,
    pub expected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionSuccessPayload {
    pub submission: Submission,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleFinishedPayload {
    pub room: Room,
    pub rankings: Vec<RoomRanking>,
    pub winner: Option<String>,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleTimeoutPayload {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomListAction {
    Created,
    Updated,
    Deleted,
}

/// Lobby-wide notification keeping room browsers current. `created` and
/// `updated` carry the room document, `deleted` only the id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListUpdatedPayload {
    pub action: RoomListAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
}

/// Everything the server pushes down the socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "found_competitor")]
    FoundCompetitor(FoundCompetitorPayload),
    #[serde(rename = "start_match")]
    StartMatch(StartMatchPayload),
    #[serde(rename = "competitor_submission")]
    CompetitorSubmission(CompetitorSubmissionPayload),
    #[serde(rename = "finish_match")]
    FinishMatch(FinishMatchPayload),
    #[serde(rename = "match_ended")]
    MatchEnded(MatchEndedPayload),
    #[serde(rename = "reject_match")]
    RejectMatch(RejectMatchPayload),
    #[serde(rename = "receive_message_match")]
    ReceiveMessageMatch(MatchChatPayload),
    #[serde(rename = "room_created")]
    RoomCreated(RoomPayload),
    #[serde(rename = "room_joined")]
    RoomJoined(RoomPayload),
    #[serde(rename = "player_joined")]
    PlayerJoined(RoomMemberPayload),
    #[serde(rename = "player_left")]
    PlayerLeft(RoomMemberPayload),
    #[serde(rename = "room_deleted")]
    RoomDeleted(RoomDeletedPayload),
    #[serde(rename = "battle_started")]
    BattleStarted(BattleStartedPayload),
    #[serde(rename = "submission_update")]
    SubmissionUpdate(SubmissionUpdatePayload),
    #[serde(rename = "submission_success")]
    SubmissionSuccess(SubmissionSuccessPayload),
    #[serde(rename = "submission_error")]
    SubmissionError(ErrorPayload),
    #[serde(rename = "battle_finished")]
    BattleFinished(BattleFinishedPayload),
    #[serde(rename = "battle_timeout")]
    BattleTimeout(BattleTimeoutPayload),
    #[serde(rename = "room-list-updated")]
    RoomListUpdated(RoomListUpdatedPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::FoundCompetitor(_) => "found_competitor",
            ServerEvent::StartMatch(_) => "start_match",
            ServerEvent::CompetitorSubmission(_) => "competitor_submission",
            ServerEvent::FinishMatch(_) => "finish_match",
            ServerEvent::MatchEnded(_) => "match_ended",
            ServerEvent::RejectMatch(_) => "reject_match",
            ServerEvent::ReceiveMessageMatch(_) => "receive_message_match",
            ServerEvent::RoomCreated(_) => "room_created",
            ServerEvent::RoomJoined(_) => "room_joined",
            ServerEvent::PlayerJoined(_) => "player_joined",
            ServerEvent::PlayerLeft(_) => "player_left",
            ServerEvent::RoomDeleted(_) => "room_deleted",
            ServerEvent::BattleStarted(_) => "battle_started",
            ServerEvent::SubmissionUpdate(_) => "submission_update",
            ServerEvent::SubmissionSuccess(_) => "submission_success",
            ServerEvent::SubmissionError(_) => "submission_error",
            ServerEvent::BattleFinished(_) => "battle_finished",
            ServerEvent::BattleTimeout(_) => "battle_timeout",
            ServerEvent::RoomListUpdated(_) => "room-list-updated",
            ServerEvent::Error(_) => "error",
        }
    }

    pub fn error(err: AppError) -> Self {
        let (status, body) = err.event_parts();
        ServerEvent::Error(error_payload(status, body))
    }

    pub fn submission_error(err: AppError) -> Self {
        let (status, body) = err.event_parts();
        ServerEvent::SubmissionError(error_payload(status, body))
    }

    pub fn room_list_created(room: Room) -> Self {
        ServerEvent::RoomListUpdated(RoomListUpdatedPayload {
            action: RoomListAction::Created,
            room: Some(room),
            room_id: None,
        })
    }

    pub fn room_list_updated(room: Room) -> Self {
        ServerEvent::RoomListUpdated(RoomListUpdatedPayload {
            action: RoomListAction::Updated,
            room: Some(room),
            room_id: None,
        })
    }

    pub fn room_list_deleted(room_id: Uuid) -> Self {
        ServerEvent::RoomListUpdated(RoomListUpdatedPayload {
            action: RoomListAction::Deleted,
            room: None,
            room_id: Some(room_id),
        })
    }
}

fn error_payload(status: u16, body: ErrorBody) -> ErrorPayload {
    ErrorPayload {
        status,
        code: body.code,
        message: body.message,
    }
}
