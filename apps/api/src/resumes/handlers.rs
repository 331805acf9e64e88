//! Read-side handlers: upload status, listing and detail.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::resume::{ResumeRow, ResumeSummary};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl PageQuery {
    fn clamped(&self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(1, MAX_LIMIT))
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub resumes: Vec<ResumeSummary>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

async fn fetch(state: &AppState, id: i64) -> Result<ResumeRow, AppError> {
    state
        .resumes
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

/// GET /api/upload/status/:id
pub async fn handle_upload_status(
    State(state): State<AppState>,
    _user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ResumeSummary>, AppError> {
    let Path(id) = id?;
    Ok(Json(fetch(&state, id).await?.into()))
}

/// GET /resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    _user: AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let Query(query) = query?;
    let (skip, limit) = query.clamped();
    let page = state.resumes.list(skip, limit).await?;
    Ok(Json(ResumeListResponse {
        resumes: page.resumes,
        total: page.total,
        skip,
        limit,
    }))
}

/// GET /resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    _user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ResumeRow>, AppError> {
    let Path(id) = id?;
    Ok(Json(fetch(&state, id).await?))
}
