use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Resume Intake API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "healthy"
    }))
}

/// GET /health
/// Pings the database and reports the configured workflow endpoint.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let database = match state.resumes.ping().await {
        Ok(()) => "healthy".to_string(),
        Err(e) => format!("unhealthy: {e}"),
    };

    Json(json!({
        "api": "healthy",
        "database": database,
        "workflow_webhook": state.config.workflow_webhook_url
    }))
}
