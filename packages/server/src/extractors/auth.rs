use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated player extracted from the `Authorization: Bearer <token>`
/// header, or from a `?token=` query parameter for websocket clients that
/// cannot set headers.
///
/// Add this as a handler parameter to require authentication.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        let query_token = parts.uri.query().and_then(token_param);

        let token = match header_token {
            Some(token) => token,
            None => query_token.as_deref().ok_or(AppError::TokenMissing)?,
        };

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;
        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
        })
    }
}

fn token_param(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("token=").map(str::to_string))
}
