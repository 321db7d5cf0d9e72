use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// Longest chat message relayed between opponents.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptMatchRequest {
    pub match_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectMatchRequest {
    pub match_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMatchRequest {
    pub match_id: Uuid,
    pub language_id: i32,
    pub source_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchChatRequest {
    pub match_id: Uuid,
    pub message: String,
}

pub fn validate_chat_message(message: &str) -> Result<(), AppError> {
    if message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".into()));
    }
    if message.chars().count() > MAX_CHAT_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "message exceeds {} characters",
            MAX_CHAT_MESSAGE_CHARS
        )));
    }
    Ok(())
}
