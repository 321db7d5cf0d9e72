use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

pub const MIN_ROOM_PLAYERS: u32 = 2;
pub const MAX_ROOM_PASSWORD_CHARS: usize = 128;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub max_players: Option<u32>,
    #[serde(default)]
    pub is_private: bool,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: Uuid,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoomRequest {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBattleRequest {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCodeRequest {
    pub room_id: Uuid,
    pub language_id: i32,
    pub source_code: String,
}

/// Validates the player cap against the configured upper limit.
pub fn validate_max_players(max_players: u32, limit: u32) -> Result<(), AppError> {
    if max_players < MIN_ROOM_PLAYERS || max_players > limit {
        return Err(AppError::Validation(format!(
            "maxPlayers must be between {} and {}",
            MIN_ROOM_PLAYERS, limit
        )));
    }
    Ok(())
}

/// Private rooms must carry a non-empty password; public rooms must not.
pub fn validate_room_password(is_private: bool, password: Option<&str>) -> Result<(), AppError> {
    match (is_private, password) {
        (true, None) => Err(AppError::Validation(
            "password is required for a private room".into(),
        )),
        (true, Some(p)) if p.trim().is_empty() => Err(AppError::Validation(
            "password is required for a private room".into(),
        )),
        (true, Some(p)) if p.chars().count() > MAX_ROOM_PASSWORD_CHARS => {
            Err(AppError::Validation(format!(
                "password exceeds {} characters",
                MAX_ROOM_PASSWORD_CHARS
            )))
        }
        _ => Ok(()),
    }
}
