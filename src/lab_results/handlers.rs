use axum::{extract::State, http::StatusCode, routing::get, Router};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateLabResultRequest, UpdateLabResultRequest},
    model::{LabResult, LabResultFilter},
};
use crate::{
    auth::extractors::AuthUser,
    documents::links::{ensure_document_free, link_document, unlink_document},
    error::AppError,
    response::{ApiJson, ApiPath, ApiQuery, ApiResponse},
    state::AppState,
};

const NOT_FOUND: &str = "Lab result not found";

pub fn lab_result_routes() -> Router<AppState> {
    Router::new()
        .route("/lab-results", get(list_lab_results).post(create_lab_result))
        .route(
            "/lab-results/:id",
            get(get_lab_result)
                .put(update_lab_result)
                .delete(delete_lab_result),
        )
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_lab_results(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(filter): ApiQuery<LabResultFilter>,
) -> Result<ApiResponse<Vec<LabResult>>, AppError> {
    let rows = state
        .lab_results
        .list_by_user(user.id, &filter.clamped())
        .await?;
    Ok(ApiResponse::data(rows))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn get_lab_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<LabResult>, AppError> {
    let row = state
        .lab_results
        .find_by_user_and_id(user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(ApiResponse::data(row))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_lab_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CreateLabResultRequest>,
) -> Result<(StatusCode, ApiResponse<LabResult>), AppError> {
    let new = payload.into_new(user.id)?;
    if let Some(document_id) = new.document_id {
        ensure_document_free(&state, user.id, document_id, None).await?;
    }

    let row = state.lab_results.create(new).await?;
    if let Some(document_id) = row.document_id {
        link_document(&state, user.id, document_id, row.id).await?;
    }

    info!(lab_result_id = %row.id, test_name = %row.test_name, "lab result created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(row).with_message("Lab result created successfully"),
    ))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn update_lab_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateLabResultRequest>,
) -> Result<ApiResponse<LabResult>, AppError> {
    let mut row = state
        .lab_results
        .find_by_user_and_id(user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let previous_document = row.document_id;
    if let Some(Some(document_id)) = payload.document_id.as_set() {
        ensure_document_free(&state, user.id, *document_id, Some(row.id)).await?;
    }
    payload.apply_to(&mut row)?;

    let updated = state
        .lab_results
        .update(&row)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if previous_document != updated.document_id {
        if let Some(old) = previous_document {
            unlink_document(&state, user.id, old, updated.id).await?;
        }
        if let Some(new) = updated.document_id {
            link_document(&state, user.id, new, updated.id).await?;
        }
    }

    info!("lab result updated");
    Ok(ApiResponse::data(updated).with_message("Lab result updated successfully"))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn delete_lab_result(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    if !state.lab_results.delete(user.id, id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }
    info!("lab result deleted");
    Ok(ApiResponse::message("Lab result deleted successfully"))
}
