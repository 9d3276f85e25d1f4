use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::{documents::links::LinkConflict, response::ApiResponse};

pub const INVALID_BODY: &str = "Invalid request body";
pub const INVALID_QUERY: &str = "Invalid query parameters";

/// Errors surfaced at the HTTP boundary.
///
/// Everything below the handlers returns `anyhow::Result`; those failures land
/// in `Internal` and are reported to the client without detail.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        let status = self.status_code();
        (status, ApiResponse::<()>::failure(self.public_message())).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<LinkConflict>() {
            Some(conflict) => (*conflict).into(),
            None => AppError::Internal(e),
        }
    }
}

impl From<LinkConflict> for AppError {
    fn from(conflict: LinkConflict) -> Self {
        AppError::Validation(conflict.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(detail = %rejection.body_text(), "rejected request body");
        AppError::Validation(INVALID_BODY.into())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::Validation("Invalid resource identifier".into())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(detail = %rejection.body_text(), "rejected query string");
        AppError::Validation(INVALID_QUERY.into())
    }
}
