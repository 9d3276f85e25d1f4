//! One-to-one link between a lab result and its source document.
//!
//! Both rows carry a reference (`lab_results.document_id` and
//! `documents.lab_result_id`), each covered by a unique index. Every write
//! that changes one side goes through here so the other side follows.

use thiserror::Error;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// A link write that would give one row two partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkConflict {
    #[error("Lab result already has a document")]
    LabResultTaken,
    #[error("Document already linked")]
    DocumentTaken,
}

/// Turns a unique violation into `conflict`; anything else passes through.
pub(crate) fn unique_violation_as(e: sqlx::Error, conflict: LinkConflict) -> anyhow::Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict.into(),
        _ => e.into(),
    }
}

/// Checks that `lab_result_id` is the caller's and free to take `document_id`.
pub(crate) async fn ensure_lab_result_free(
    state: &AppState,
    user_id: Uuid,
    lab_result_id: Uuid,
    document_id: Option<Uuid>,
) -> Result<(), AppError> {
    state
        .lab_results
        .find_by_user_and_id(user_id, lab_result_id)
        .await?
        .ok_or_else(|| AppError::not_found("Lab result not found"))?;

    if let Some(existing) = state.documents.find_by_lab_result(lab_result_id).await? {
        if Some(existing.id) != document_id {
            return Err(LinkConflict::LabResultTaken.into());
        }
    }
    Ok(())
}

/// Checks that `document_id` is the caller's and free to take `lab_result_id`.
pub(crate) async fn ensure_document_free(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
    lab_result_id: Option<Uuid>,
) -> Result<(), AppError> {
    let doc = state
        .documents
        .find_by_user_and_id(user_id, document_id)
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    match doc.lab_result_id {
        Some(linked) if Some(linked) != lab_result_id => Err(LinkConflict::DocumentTaken.into()),
        _ => Ok(()),
    }
}

/// Points the lab result's back-reference at `document_id`.
pub(crate) async fn link_lab_result(
    state: &AppState,
    user_id: Uuid,
    lab_result_id: Uuid,
    document_id: Uuid,
) -> anyhow::Result<()> {
    if let Some(mut lab) = state
        .lab_results
        .find_by_user_and_id(user_id, lab_result_id)
        .await?
    {
        if lab.document_id != Some(document_id) {
            lab.document_id = Some(document_id);
            state.lab_results.update(&lab).await?;
        }
    }
    Ok(())
}

/// Clears the lab result's back-reference if it still points at `document_id`.
pub(crate) async fn unlink_lab_result(
    state: &AppState,
    user_id: Uuid,
    lab_result_id: Uuid,
    document_id: Uuid,
) -> anyhow::Result<()> {
    if let Some(mut lab) = state
        .lab_results
        .find_by_user_and_id(user_id, lab_result_id)
        .await?
    {
        if lab.document_id == Some(document_id) {
            lab.document_id = None;
            state.lab_results.update(&lab).await?;
        }
    }
    Ok(())
}

/// Points the document's back-reference at `lab_result_id`.
pub(crate) async fn link_document(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
    lab_result_id: Uuid,
) -> anyhow::Result<()> {
    if let Some(mut doc) = state
        .documents
        .find_by_user_and_id(user_id, document_id)
        .await?
    {
        if doc.lab_result_id != Some(lab_result_id) {
            doc.lab_result_id = Some(lab_result_id);
            state.documents.update(&doc).await?;
        }
    }
    Ok(())
}

/// Clears the document's back-reference if it still points at `lab_result_id`.
pub(crate) async fn unlink_document(
    state: &AppState,
    user_id: Uuid,
    document_id: Uuid,
    lab_result_id: Uuid,
) -> anyhow::Result<()> {
    if let Some(mut doc) = state
        .documents
        .find_by_user_and_id(user_id, document_id)
        .await?
    {
        if doc.lab_result_id == Some(lab_result_id) {
            doc.lab_result_id = None;
            state.documents.update(&doc).await?;
        }
    }
    Ok(())
}
