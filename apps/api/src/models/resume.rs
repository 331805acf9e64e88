use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Lifecycle stage of a résumé record.
///
/// `pending → processing → completed` only moves forward. A `completed` record
/// may be completed again with fresh analysis results. `failed` is reachable
/// from `pending` and `processing` and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Error)]
#[error("unknown resume status '{0}'")]
pub struct UnknownStatus(String);

impl ResumeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResumeStatus::Pending => "pending",
            ResumeStatus::Processing => "processing",
            ResumeStatus::Completed => "completed",
            ResumeStatus::Failed => "failed",
        }
    }

    /// States a record may be in for a move into `self` to be legal.
    pub fn predecessors(self) -> &'static [ResumeStatus] {
        match self {
            ResumeStatus::Pending => &[],
            ResumeStatus::Processing => &[ResumeStatus::Pending],
            ResumeStatus::Completed => &[
                ResumeStatus::Pending,
                ResumeStatus::Processing,
                ResumeStatus::Completed,
            ],
            ResumeStatus::Failed => &[ResumeStatus::Pending, ResumeStatus::Processing],
        }
    }

    pub fn can_transition_to(self, next: ResumeStatus) -> bool {
        next.predecessors().contains(&self)
    }
}

impl fmt::Display for ResumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ResumeStatus::Pending),
            "processing" => Ok(ResumeStatus::Processing),
            "completed" => Ok(ResumeStatus::Completed),
            "failed" => Ok(ResumeStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ResumeStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResumeRow {
    pub id: i64,
    pub stored_filename: String,
    pub original_filename: String,
    #[sqlx(try_from = "String")]
    pub status: ResumeStatus,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<f64>,
    pub last_job_title: Option<String>,
    pub raw_text: Option<String>,
    pub uploaded_by: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing / status view: everything except the raw text.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResumeSummary {
    pub id: i64,
    pub original_filename: String,
    #[sqlx(try_from = "String")]
    pub status: ResumeStatus,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<f64>,
    pub last_job_title: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeSummary {
    fn from(row: ResumeRow) -> Self {
        Self {
            id: row.id,
            original_filename: row.original_filename,
            status: row.status,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            skills: row.skills,
            experience_years: row.experience_years,
            last_job_title: row.last_job_title,
            uploaded_at: row.uploaded_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct NewResume<'a> {
    pub stored_filename: &'a str,
    pub original_filename: &'a str,
    pub uploaded_by: Option<i64>,
}

/// Fields reported by the analysis engine. Absent values overwrite with NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub skills: Vec<String>,
    pub experience_years: Option<f64>,
    pub last_job_title: Option<String>,
    pub raw_text: Option<String>,
}

/// Engines send `"skills": null` when nothing was extracted.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
