use axum::{
    body::Bytes,
    extract::State,
    routing::{get, put},
    Router,
};
use tracing::{info, instrument, warn};

use super::{dto::UpdateProfileRequest, model::PublicUser};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, INVALID_BODY},
    response::{ApiJson, ApiResponse},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/onboarding", put(complete_onboarding))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(AuthUser(user): AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::data(PublicUser::from(&user))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<ApiResponse<PublicUser>, AppError> {
    payload.apply_to(&mut user)?;

    let updated = state
        .users
        .update(&user)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!("profile updated");
    Ok(ApiResponse::data(PublicUser::from(&updated)).with_message("Profile updated successfully"))
}

/// Accepts the same body as `PUT /profile`, or none at all, then marks
/// onboarding done. A body that is present must be valid.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn complete_onboarding(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    body: Bytes,
) -> Result<ApiResponse<PublicUser>, AppError> {
    if let Some(payload) = optional_profile_body(&body)? {
        payload.apply_to(&mut user)?;
    }
    user.onboarding_completed = true;

    let updated = state
        .users
        .update(&user)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!("onboarding completed");
    Ok(ApiResponse::data(PublicUser::from(&updated)).with_message("Onboarding completed"))
}

fn optional_profile_body(body: &[u8]) -> Result<Option<UpdateProfileRequest>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| {
        warn!(error = %e, "rejected onboarding body");
        AppError::validation(INVALID_BODY)
    })
}
