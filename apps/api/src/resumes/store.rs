use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use crate::errors::AppError;
use crate::models::resume::{AnalysisResults, NewResume, ResumeRow, ResumeStatus, ResumeSummary};

pub struct ResumePage {
    pub resumes: Vec<ResumeSummary>,
    pub total: i64,
}

/// Persistence for résumé records.
///
/// Every status write is a single guarded statement: the row only changes if
/// its current status is a legal predecessor of the target status. Callers get
/// `false` back when the guard (or a missing id) left the row untouched.
///
/// Carried in `AppState` as `Arc<dyn ResumeStore>`.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn create_pending(&self, new: NewResume<'_>) -> Result<i64, AppError>;

    async fn get(&self, id: i64) -> Result<Option<ResumeRow>, AppError>;

    /// Newest upload first.
    async fn list(&self, skip: i64, limit: i64) -> Result<ResumePage, AppError>;

    async fn transition(&self, id: i64, to: ResumeStatus) -> Result<bool, AppError>;

    /// Overwrites every extracted field and marks the record `completed`.
    async fn complete(&self, id: i64, results: &AnalysisResults) -> Result<bool, AppError>;

    /// Moves records still `pending` that were uploaded before `cutoff` to `failed`.
    async fn fail_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn predecessor_names(to: ResumeStatus) -> Vec<String> {
    to.predecessors()
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn create_pending(&self, new: NewResume<'_>) -> Result<i64, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO resumes (stored_filename, original_filename, status, uploaded_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(new.stored_filename)
        .bind(new.original_filename)
        .bind(ResumeStatus::Pending.as_str())
        .bind(new.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted pending resume {id} ({})", new.stored_filename);
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<ResumeRow>, AppError> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<ResumePage, AppError> {
        let resumes = sqlx::query_as::<_, ResumeSummary>(
            r#"
            SELECT id, original_filename, status, full_name, email, phone, skills,
                   experience_years, last_job_title, uploaded_at, updated_at
            FROM resumes
            ORDER BY uploaded_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes")
            .fetch_one(&self.pool)
            .await?;

        Ok(ResumePage { resumes, total })
    }

    async fn transition(&self, id: i64, to: ResumeStatus) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE resumes
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = ANY($3)
            "#,
        )
        .bind(to.as_str())
        .bind(id)
        .bind(predecessor_names(to))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn complete(&self, id: i64, results: &AnalysisResults) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE resumes SET
                full_name = $1,
                email = $2,
                phone = $3,
                skills = $4,
                experience_years = $5,
                last_job_title = $6,
                raw_text = $7,
                status = $8,
                updated_at = NOW()
            WHERE id = $9 AND status = ANY($10)
            "#,
        )
        .bind(&results.full_name)
        .bind(&results.email)
        .bind(&results.phone)
        .bind(&results.skills)
        .bind(results.experience_years)
        .bind(&results.last_job_title)
        .bind(&results.raw_text)
        .bind(ResumeStatus::Completed.as_str())
        .bind(id)
        .bind(predecessor_names(ResumeStatus::Completed))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE resumes
            SET status = $1, updated_at = NOW()
            WHERE status = $2 AND uploaded_at < $3
            "#,
        )
        .bind(ResumeStatus::Failed.as_str())
        .bind(ResumeStatus::Pending.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
