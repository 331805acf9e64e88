pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::resumes::{callback, files::MAX_UPLOAD_BYTES, handlers as resumes, upload};
use crate::state::AppState;

/// Headroom above the file ceiling for multipart boundaries and headers, so an
/// oversized file is rejected by the receiver with a 400 instead of a 413.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Credential store
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/me", get(auth::handle_me))
        // Upload + analysis loop
        .route(
            "/api/upload",
            post(upload::handle_upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/upload/status/:id", get(resumes::handle_upload_status))
        .route(
            "/api/webhook/analysis-complete",
            post(callback::handle_analysis_complete),
        )
        // Records
        .route("/resumes", get(resumes::handle_list_resumes))
        .route("/resumes/:id", get(resumes::handle_get_resume))
        .with_state(state)
}
