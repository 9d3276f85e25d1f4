use axum::{extract::State, http::StatusCode, routing::get, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::CreateTrendRequest,
    model::{TrendData, TrendFilter},
};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    response::{ApiJson, ApiPath, ApiQuery, ApiResponse},
    state::AppState,
};

const NOT_FOUND: &str = "Trend data not found";

pub fn trend_routes() -> Router<AppState> {
    Router::new()
        .route("/trends", get(list_trends).post(create_trend))
        .route("/trends/:id", get(get_trend).delete(delete_trend))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_trends(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(filter): ApiQuery<TrendFilter>,
) -> Result<ApiResponse<Vec<TrendData>>, AppError> {
    let rows = state
        .trends
        .list_by_user(user.id, &filter.normalized())
        .await?;
    Ok(ApiResponse::data(rows))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn get_trend(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<TrendData>, AppError> {
    let row = state
        .trends
        .find_by_user_and_id(user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(ApiResponse::data(row))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_trend(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CreateTrendRequest>,
) -> Result<(StatusCode, ApiResponse<TrendData>), AppError> {
    let row = state.trends.create(payload.into_new(user.id)?).await?;
    info!(trend_id = %row.id, test_name = %row.test_name, "trend data stored");
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(row).with_message("Trend data created successfully"),
    ))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn delete_trend(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    if !state.trends.delete(user.id, id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    Ok(ApiResponse::message("Trend data deleted successfully"))
}
