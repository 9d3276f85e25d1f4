use std::time::Duration;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
    Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{UpdateDocumentRequest, UploadForm},
    links::{ensure_lab_result_free, link_lab_result, unlink_lab_result},
    model::{ext_from_mime, mime_from_file_name, object_key, Document, NewDocument},
};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    field::FieldUpdate,
    response::{ApiJson, ApiPath, ApiResponse},
    state::AppState,
    users::dto::blank_to_none,
};

const NOT_FOUND: &str = "Document not found";
const INVALID_UPLOAD: &str = "Invalid multipart body";
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(10 * 60);

pub fn document_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/documents",
            get(list_documents)
                .post(upload_document)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/documents/:id",
            get(get_document)
                .put(update_document)
                .delete(delete_document),
        )
        .route("/documents/:id/download", get(download_document))
}

async fn read_upload_form(mut mp: Multipart) -> Result<UploadForm, AppError> {
    let bad = |e: axum::extract::multipart::MultipartError| {
        warn!(detail = %e.body_text(), "rejected multipart field");
        AppError::validation(INVALID_UPLOAD)
    };
    let mut form = UploadForm::default();

    while let Some(field) = mp.next_field().await.map_err(bad)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                form.file_name = field.file_name().map(str::to_string);
                form.content_type = field.content_type().map(str::to_string);
                form.body = Some(field.bytes().await.map_err(bad)?);
            }
            Some("description") => {
                form.description = blank_to_none(Some(field.text().await.map_err(bad)?));
            }
            Some("lab_result_id") => {
                let raw = field.text().await.map_err(bad)?;
                if !raw.trim().is_empty() {
                    let id = raw
                        .trim()
                        .parse::<Uuid>()
                        .map_err(|_| AppError::validation("Invalid lab_result_id"))?;
                    form.lab_result_id = Some(id);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_documents(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<Vec<Document>>, AppError> {
    let docs = state.documents.list_by_user(user.id).await?;
    Ok(ApiResponse::data(docs))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn get_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Document>, AppError> {
    let doc = state
        .documents
        .find_by_user_and_id(user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(ApiResponse::data(doc))
}

/// POST /documents (multipart)
/// Fields: `file` (required), `description`, `lab_result_id`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn upload_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, ApiResponse<Document>), AppError> {
    let mp = multipart.map_err(|e| {
        warn!(detail = %e.body_text(), "rejected multipart body");
        AppError::validation(INVALID_UPLOAD)
    })?;
    let form = read_upload_form(mp).await?;

    let Some(body) = form.body.filter(|b| !b.is_empty()) else {
        return Err(AppError::validation("A file is required"));
    };
    let file_name = blank_to_none(form.file_name).unwrap_or_else(|| "document".into());
    let file_type = form
        .content_type
        .as_deref()
        .filter(|ct| ext_from_mime(ct).is_some())
        .or_else(|| mime_from_file_name(&file_name))
        .ok_or_else(|| AppError::validation("Unsupported file type"))?
        .to_string();
    let ext = ext_from_mime(&file_type).unwrap_or("bin");

    if let Some(lab_result_id) = form.lab_result_id {
        ensure_lab_result_free(&state, user.id, lab_result_id, None).await?;
    }

    let id = Uuid::new_v4();
    let key = object_key(user.id, id, ext);
    let file_size = body.len() as i64;
    state
        .storage
        .put_object(&key, body, &file_type)
        .await
        .map_err(|e| e.context(format!("put_object {key}")))?;

    let new = NewDocument {
        id,
        user_id: user.id,
        lab_result_id: form.lab_result_id,
        file_name,
        file_path: key.clone(),
        file_type,
        file_size,
        description: form.description,
    };
    let doc = match state.documents.create(new).await {
        Ok(doc) => doc,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete_object(&key).await {
                error!(error = %cleanup, %key, "orphaned object after failed insert");
            }
            return Err(e.into());
        }
    };

    if let Some(lab_result_id) = doc.lab_result_id {
        link_lab_result(&state, user.id, lab_result_id, doc.id).await?;
    }

    info!(document_id = %doc.id, size = doc.file_size, "document uploaded");
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(doc).with_message("Document uploaded successfully"),
    ))
}

/// 307 → short-lived presigned URL for the stored file.
#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn download_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Redirect, AppError> {
    let doc = state
        .documents
        .find_by_user_and_id(user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let url = state
        .storage
        .presign_get(&doc.file_path, &doc.file_name, DOWNLOAD_URL_TTL)
        .await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn update_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateDocumentRequest>,
) -> Result<ApiResponse<Document>, AppError> {
    let mut doc = state
        .documents
        .find_by_user_and_id(user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let previous_link = doc.lab_result_id;
    if let FieldUpdate::SetTo(Some(lab_result_id)) = payload.lab_result_id {
        ensure_lab_result_free(&state, user.id, lab_result_id, Some(doc.id)).await?;
    }
    if let FieldUpdate::SetTo(description) = payload.description {
        doc.description = blank_to_none(description);
    }
    payload.lab_result_id.apply(&mut doc.lab_result_id);

    let updated = state
        .documents
        .update(&doc)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if previous_link != updated.lab_result_id {
        if let Some(old) = previous_link {
            unlink_lab_result(&state, user.id, old, updated.id).await?;
        }
        if let Some(new) = updated.lab_result_id {
            link_lab_result(&state, user.id, new, updated.id).await?;
        }
    }

    info!("document updated");
    Ok(ApiResponse::data(updated).with_message("Document updated successfully"))
}

#[instrument(skip_all, fields(user_id = %user.id, %id))]
pub async fn delete_document(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    let doc = state
        .documents
        .find_by_user_and_id(user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if !state.documents.delete(user.id, id).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }

    if let Err(e) = state.storage.delete_object(&doc.file_path).await {
        warn!(error = %e, key = %doc.file_path, "failed to delete stored object");
    }

    info!("document deleted");
    Ok(ApiResponse::message("Document deleted successfully"))
}
