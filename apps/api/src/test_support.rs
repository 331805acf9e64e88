//! In-memory stand-ins for the Postgres stores and the webhook trigger, plus
//! helpers for driving the real router in tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::Algorithm;
use serde_json::Value;
use tower::ServiceExt;

use crate::auth::{password::hash_password, TokenIssuer, UserStore};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::resume::{AnalysisResults, NewResume, ResumeRow, ResumeStatus};
use crate::models::user::{NewUser, UserRow};
use crate::resumes::store::{ResumePage, ResumeStore};
use crate::resumes::trigger::{TriggerError, TriggerRequest, WorkflowTrigger};
use crate::resumes::FileReceiver;
use crate::routes::build_router;
use crate::state::AppState;

pub const TEST_SECRET: &str = "test-secret";

fn storage_down() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

// ────────────────────────────────────────────────────────────────────────────
// Users
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserRow>>,
}

impl MemoryUserStore {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn set_active(&self, username: &str, active: bool) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<UserRow>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.username == username && u.is_active)
            .cloned())
    }

    async fn exists_with(&self, username: &str, email: &str) -> Result<bool, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .any(|u| u.username == username || u.email == email))
    }

    async fn insert(&self, user: NewUser<'_>) -> Result<UserRow, AppError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::Validation(
                "Username or email already registered".to_string(),
            ));
        }
        let row = UserRow {
            id: users.len() as i64 + 1,
            username: user.username.to_string(),
            email: user.email.to_string(),
            hashed_password: user.hashed_password.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        users.push(row.clone());
        Ok(row)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Résumés
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryResumeStore {
    rows: Mutex<Vec<ResumeRow>>,
    /// When set, `complete` fails as if the database were unreachable.
    pub fail_complete: AtomicBool,
    /// When set, `transition` fails as if the database were unreachable.
    pub fail_transition: AtomicBool,
}

impl MemoryResumeStore {
    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn row(&self, id: i64) -> Option<ResumeRow> {
        self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn insert_row(
        &self,
        stored: &str,
        status: ResumeStatus,
        uploaded_at: DateTime<Utc>,
    ) -> i64 {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(ResumeRow {
            id,
            stored_filename: stored.to_string(),
            original_filename: format!("{stored}-original.pdf"),
            status,
            full_name: None,
            email: None,
            phone: None,
            skills: Vec::new(),
            experience_years: None,
            last_job_title: None,
            raw_text: None,
            uploaded_by: None,
            uploaded_at,
            updated_at: uploaded_at,
        });
        id
    }

    pub fn set_fields(&self, id: i64, results: &AnalysisResults) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            apply(row, results);
        }
    }
}

fn apply(row: &mut ResumeRow, results: &AnalysisResults) {
    row.full_name = results.full_name.clone();
    row.email = results.email.clone();
    row.phone = results.phone.clone();
    row.skills = results.skills.clone();
    row.experience_years = results.experience_years;
    row.last_job_title = results.last_job_title.clone();
    row.raw_text = results.raw_text.clone();
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn create_pending(&self, new: NewResume<'_>) -> Result<i64, AppError> {
        let id = self.insert_row(new.stored_filename, ResumeStatus::Pending, Utc::now());
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.original_filename = new.original_filename.to_string();
            row.uploaded_by = new.uploaded_by;
        }
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<ResumeRow>, AppError> {
        Ok(self.row(id))
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<ResumePage, AppError> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        let total = rows.len() as i64;
        let resumes = rows
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(Into::into)
            .collect();
        Ok(ResumePage { resumes, total })
    }

    async fn transition(&self, id: i64, to: ResumeStatus) -> Result<bool, AppError> {
        if self.fail_transition.load(Ordering::SeqCst) {
            return Err(storage_down());
        }
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) if row.status.can_transition_to(to) => {
                row.status = to;
                row.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, id: i64, results: &AnalysisResults) -> Result<bool, AppError> {
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(storage_down());
        }
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) if row.status.can_transition_to(ResumeStatus::Completed) => {
                apply(row, results);
                row.status = ResumeStatus::Completed;
                row.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let mut swept = 0;
        for row in rows
            .iter_mut()
            .filter(|r| r.status == ResumeStatus::Pending && r.uploaded_at < cutoff)
        {
            row.status = ResumeStatus::Failed;
            row.updated_at = Utc::now();
            swept += 1;
        }
        Ok(swept)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Workflow trigger
// ────────────────────────────────────────────────────────────────────────────

pub enum TriggerReply {
    Ok(Value),
    Rejected(u16, &'static str),
}

/// Records each call together with the record status seen at call time.
pub struct FakeTrigger {
    store: Arc<MemoryResumeStore>,
    reply: TriggerReply,
    pub calls: Mutex<Vec<(TriggerRequest, Option<ResumeStatus>)>>,
}

impl FakeTrigger {
    pub fn new(store: Arc<MemoryResumeStore>, reply: TriggerReply) -> Self {
        Self {
            store,
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WorkflowTrigger for FakeTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<Value, TriggerError> {
        let seen = self.store.row(request.resume_id).map(|r| r.status);
        self.calls.lock().unwrap().push((request.clone(), seen));
        match &self.reply {
            TriggerReply::Ok(value) => Ok(value.clone()),
            TriggerReply::Rejected(status, body) => Err(TriggerError::Rejected {
                status: *status,
                body: body.to_string(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Harness
// ────────────────────────────────────────────────────────────────────────────

pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserStore>,
    pub resumes: Arc<MemoryResumeStore>,
    pub trigger: Arc<FakeTrigger>,
    pub tokens: TokenIssuer,
    pub upload_dir: tempfile::TempDir,
}

pub fn test_config(upload_dir: &Path) -> Config {
    Config {
        database_url: "postgresql://unused".to_string(),
        secret_key: TEST_SECRET.to_string(),
        jwt_algorithm: Algorithm::HS256,
        access_token_ttl: chrono::Duration::minutes(30),
        workflow_webhook_url: "http://engine.test/webhook".to_string(),
        workflow_timeout: None,
        upload_dir: upload_dir.to_path_buf(),
        stale_pending_after: None,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

impl TestApp {
    pub fn new(reply: TriggerReply) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = test_config(upload_dir.path());
        let users = Arc::new(MemoryUserStore::default());
        let resumes = Arc::new(MemoryResumeStore::default());
        let trigger = Arc::new(FakeTrigger::new(resumes.clone(), reply));
        let tokens = TokenIssuer::from_config(&config);

        let state = AppState {
            users: users.clone(),
            resumes: resumes.clone(),
            trigger: trigger.clone(),
            files: FileReceiver::new(upload_dir.path()),
            tokens: tokens.clone(),
            config,
        };

        Self {
            router: build_router(state),
            users,
            resumes,
            trigger,
            tokens,
            upload_dir,
        }
    }

    pub fn accepting() -> Self {
        Self::new(TriggerReply::Ok(serde_json::json!({ "message": "Workflow was started" })))
    }

    /// Creates an active user directly in the store and returns a bearer token.
    pub async fn login_as(&self, username: &str) -> String {
        let hash = hash_password("pw").unwrap();
        self.users
            .insert(NewUser {
                username,
                email: &format!("{username}@example.com"),
                hashed_password: &hash,
            })
            .await
            .unwrap();
        self.tokens.issue(username).unwrap()
    }

    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "----resume-intake-test-boundary";

/// Builds a `multipart/form-data` upload with a single file part.
pub fn upload_request(
    field: &str,
    filename: &str,
    content_type: &str,
    content: &[u8],
    token: &str,
) -> Request<Body> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}
