pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

/// Room for multipart framing around the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/export-options", get(handlers::handle_export_options))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/resume",
            post(handlers::handle_upload_resume).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/sessions/:id/job-description",
            put(handlers::handle_set_job_description),
        )
        .route("/api/v1/sessions/:id/tune", post(handlers::handle_tune))
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .route(
            "/api/v1/sessions/:id/document",
            get(handlers::handle_get_document),
        )
        .route("/api/v1/sessions/:id/export", post(handlers::handle_export))
        .with_state(state)
}
