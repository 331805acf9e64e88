use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::{AnalysisResults, ResumeStatus};
use crate::resumes::compensation;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalysisCallback {
    pub resume_id: Option<i64>,
    #[serde(default)]
    pub analysis_results: AnalysisResults,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub message: String,
    pub resume_id: i64,
}

/// POST /api/webhook/analysis-complete
///
/// Called by the analysis engine. Extracted fields are replaced wholesale,
/// never merged with earlier values. A redelivery to a `completed` record
/// overwrites it again; only `failed` records refuse results.
pub async fn handle_analysis_complete(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisCallback>, JsonRejection>,
) -> Result<Json<CallbackResponse>, AppError> {
    let Json(callback) = payload?;
    let resume_id = callback
        .resume_id
        .ok_or_else(|| AppError::Validation("Missing resume_id".to_string()))?;

    match state
        .resumes
        .complete(resume_id, &callback.analysis_results)
        .await
    {
        Ok(true) => {
            info!("Analysis results stored for resume {resume_id}");
            Ok(Json(CallbackResponse {
                message: "Analysis results updated successfully".to_string(),
                resume_id,
            }))
        }
        Ok(false) => Err(explain_untouched(&state, resume_id).await),
        Err(e) => {
            compensation::mark_failed(state.resumes.as_ref(), resume_id, &e.to_string()).await;
            Err(e)
        }
    }
}

/// The guarded update matched nothing: either the id is unknown or the record
/// is in a state that refuses results.
async fn explain_untouched(state: &AppState, resume_id: i64) -> AppError {
    match state.resumes.get(resume_id).await {
        Ok(None) => AppError::NotFound("Resume not found".to_string()),
        Ok(Some(row)) if !row.status.can_transition_to(ResumeStatus::Completed) => {
            AppError::Conflict(format!(
                "Resume {resume_id} is already {} and cannot accept analysis results",
                row.status
            ))
        }
        Ok(Some(row)) => AppError::Conflict(format!(
            "Resume {resume_id} changed to {} while results were being stored",
            row.status
        )),
        Err(e) => e,
    }
}
