use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::extract_token;
use crate::{error::AppError, state::AppState, users::model::User};

/// Authenticated caller.
///
/// Verifies the bearer token and reloads the user row, so tokens belonging to
/// deleted accounts are rejected even before they expire.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = extract_token(header)
            .ok_or_else(|| AppError::unauthorized("Access denied. No token provided."))?;

        let payload = state.keys.verify_token(token).ok_or_else(|| {
            warn!("invalid or expired token");
            AppError::unauthorized("Invalid or expired token")
        })?;

        let user = state
            .users
            .find_by_id(payload.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %payload.user_id, "token for unknown user");
                AppError::unauthorized("User not found")
            })?;

        Ok(AuthUser(user))
    }
}
