use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::resume::{NewResume, ResumeStatus};
use crate::resumes::compensation;
use crate::resumes::files::{validate_declared, StoredUpload};
use crate::resumes::trigger::TriggerRequest;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub resume_id: i64,
    pub filename: String,
    pub status: ResumeStatus,
    pub workflow_triggered: bool,
    pub workflow_result: serde_json::Value,
}

/// POST /api/upload
///
/// validate → store file → insert `pending` record → trigger workflow →
/// advance to `processing`. A failed trigger marks the record `failed`.
pub async fn handle_upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let upload = receive_file(&state, &mut multipart).await?;

    let resume_id = match state
        .resumes
        .create_pending(NewResume {
            stored_filename: &upload.stored_filename,
            original_filename: &upload.original_filename,
            uploaded_by: Some(user.id),
        })
        .await
    {
        Ok(id) => id,
        Err(e) => {
            state.files.discard(&upload).await;
            return Err(e);
        }
    };
    info!(
        "User {} uploaded resume {resume_id} ({} bytes, '{}')",
        user.id, upload.size, upload.original_filename
    );

    let request = TriggerRequest {
        resume_id,
        file_path: upload.path.to_string_lossy().into_owned(),
        filename: upload.original_filename.clone(),
        timestamp: Utc::now(),
    };
    let workflow_result = match state.trigger.trigger(&request).await {
        Ok(result) => result,
        Err(e) => {
            let message = e.to_string();
            compensation::mark_failed(state.resumes.as_ref(), resume_id, &message).await;
            return Err(AppError::Workflow(message));
        }
    };

    // The callback may already have landed; the guarded update never regresses it.
    let status = match state
        .resumes
        .transition(resume_id, ResumeStatus::Processing)
        .await
    {
        Ok(true) => ResumeStatus::Processing,
        Ok(false) => current_status(&state, resume_id).await,
        Err(e) => {
            warn!("Resume {resume_id} triggered but not advanced to processing: {e}");
            ResumeStatus::Pending
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Resume uploaded successfully".to_string(),
            resume_id,
            filename: upload.original_filename,
            status,
            workflow_triggered: true,
            workflow_result,
        }),
    ))
}

async fn receive_file(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<StoredUpload, AppError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let original_filename = validate_declared(field.file_name(), field.content_type())?;
        let content = state.files.read_limited(&mut field).await?;
        return state.files.persist(&original_filename, &content).await;
    }
    Err(AppError::Validation(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

async fn current_status(state: &AppState, resume_id: i64) -> ResumeStatus {
    match state.resumes.get(resume_id).await {
        Ok(Some(row)) => row.status,
        _ => ResumeStatus::Pending,
    }
}
