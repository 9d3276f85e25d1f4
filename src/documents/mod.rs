use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod links;
pub mod model;
pub mod repo;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    handlers::document_routes(max_upload_bytes)
}
