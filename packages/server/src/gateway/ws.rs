use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::gateway::connections::ConnectionId;
use crate::gateway::dispatch::dispatch;
use crate::gateway::events::{ClientEvent, ServerEvent};
use crate::gateway::LOBBY_CHANNEL;
use crate::state::AppState;

/// `GET /ws`. Authentication happens before the upgrade; an unauthenticated
/// request never becomes a socket.
pub async fn ws_handler(
    user: AuthUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket, user))
}

async fn handle_socket(state: AppState, socket: WebSocket, user: AuthUser) {
    let (mut sink, mut stream) = socket.split();
    let (connection, mut outbound) = state.connections.register(user.user_id, &user.username);
    state.pubsub.subscribe(connection, LOBBY_CHANNEL);
    info!(user = %user.username, %connection, "websocket connected");

    loop {
        tokio::select! {
            Some(event) = outbound.recv() => {
                let frame = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(event = event.name(), error = %err, "failed to encode event");
                        continue;
                    }
                };
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else { break };
                match message {
                    Message::Text(text) => {
                        let event: ClientEvent = match serde_json::from_str(&text) {
                            Ok(event) => event,
                            Err(err) => {
                                state.connections.send_to(
                                    connection,
                                    ServerEvent::error(AppError::Validation(format!(
                                        "unrecognized event: {err}"
                                    ))),
                                );
                                continue;
                            }
                        };
                        if matches!(event, ClientEvent::Disconnect) {
                            break;
                        }
                        let is_submission = event.is_submission();
                        if let Err(err) =
                            dispatch(&state, connection, user.user_id, &user.username, event).await
                        {
                            let reply = if is_submission {
                                ServerEvent::submission_error(err)
                            } else {
                                ServerEvent::error(err)
                            };
                            state.connections.send_to(connection, reply);
                        }
                    }
                    Message::Close(_) => break,
                    // Ping/pong is handled by the library; binary frames are ignored.
                    _ => {}
                }
            }
            else => break,
        }
    }

    disconnect_cleanup(&state, connection, user.user_id, &user.username).await;
}

/// Disconnect semantics: drop out of the waiting pool, leave the joined room
/// as if `leave-room` was sent, then scrub the connection everywhere.
pub async fn disconnect_cleanup(
    state: &AppState,
    connection: ConnectionId,
    user_id: Uuid,
    username: &str,
) {
    state.matchmaker.cancel(user_id).await;
    if let Some(room_id) = state.connections.joined_room(connection) {
        if let Err(err) = state.rooms.leave(room_id, username, Some(connection)).await {
            debug!(room = %room_id, error = %err, "implicit room leave skipped");
        }
    }
    state.pubsub.drop_connection(connection);
    state.connections.deregister(connection);
    info!(user = %username, %connection, "websocket disconnected");
}
