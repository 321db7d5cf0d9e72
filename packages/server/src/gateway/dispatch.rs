use tracing::instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::gateway::connections::ConnectionId;
use crate::gateway::events::{ClientEvent, RoomPayload, ServerEvent, SubmissionSuccessPayload};
use crate::models::matchmaking::validate_chat_message;
use crate::models::submission::validate_submission;
use crate::state::AppState;

/// Routes one inbound event to its service.
///
/// Direct replies to the caller are queued here; everything channel-wide is
/// published by the services themselves. An `Err` becomes an `error` or
/// `submission_error` frame in the socket loop.
#[instrument(skip_all, fields(event = event.name(), user = %username))]
pub async fn dispatch(
    state: &AppState,
    connection: ConnectionId,
    user_id: Uuid,
    username: &str,
    event: ClientEvent,
) -> Result<(), AppError> {
    match event {
        ClientEvent::FindMatch => {
            state
                .matchmaker
                .enqueue(user_id, username, connection)
                .await?;
            Ok(())
        }
        ClientEvent::LeaveWaiting => {
            state.matchmaker.cancel(user_id).await;
            Ok(())
        }
        ClientEvent::AcceptMatch(req) => state.matches.accept(req.match_id, user_id).await,
        ClientEvent::RejectMatch(req) => state.matches.reject(req.match_id, user_id).await,
        ClientEvent::SubmitMatch(req) => {
            validate_submission(req.language_id, &req.source_code)?;
            let submission = state
                .matches
                .submit(
                    req.match_id,
                    user_id,
                    username,
                    connection,
                    req.language_id,
                    req.source_code,
                )
                .await?;
            state.connections.send_to(
                connection,
                ServerEvent::SubmissionSuccess(SubmissionSuccessPayload { submission }),
            );
            Ok(())
        }
        ClientEvent::SendMessageMatch(req) => {
            validate_chat_message(&req.message)?;
            state
                .matches
                .chat(req.match_id, username, connection, req.message)
                .await
        }
        ClientEvent::CreateRoom(req) => {
            let room = state.rooms.create(username, connection, req).await?;
            state.connections.set_joined_room(connection, Some(room.id));
            state
                .connections
                .send_to(connection, ServerEvent::RoomCreated(RoomPayload { room }));
            Ok(())
        }
        ClientEvent::JoinRoom(req) => {
            let room = state
                .rooms
                .join(req.room_id, username, connection, req.password)
                .await?;
            state.connections.set_joined_room(connection, Some(room.id));
            state
                .connections
                .send_to(connection, ServerEvent::RoomJoined(RoomPayload { room }));
            Ok(())
        }
        ClientEvent::LeaveRoom(req) => {
            state
                .rooms
                .leave(req.room_id, username, Some(connection))
                .await?;
            state.connections.set_joined_room(connection, None);
            Ok(())
        }
        ClientEvent::StartBattle(req) => state.rooms.start(req.room_id, username).await,
        ClientEvent::SubmitCode(req) => {
            validate_submission(req.language_id, &req.source_code)?;
            let submission = state
                .rooms
                .submit(
                    req.room_id,
                    user_id,
                    username,
                    req.language_id,
                    req.source_code,
                )
                .await?;
            state.connections.send_to(
                connection,
                ServerEvent::SubmissionSuccess(SubmissionSuccessPayload { submission }),
            );
            Ok(())
        }
        // The socket loop closes the connection before dispatch sees this.
        ClientEvent::Disconnect => Ok(()),
    }
}
