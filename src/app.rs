use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth, documents, lab_results, response::ApiResponse, state::AppState, trends, users,
};

pub fn build_app(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(lab_results::router())
                .merge(documents::router(max_upload_bytes))
                .merge(trends::router())
                .route("/health", get(|| async { "ok" })),
        )
        .fallback(route_not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn route_not_found() -> (StatusCode, ApiResponse<()>) {
    (StatusCode::NOT_FOUND, ApiResponse::failure("Route not found"))
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
