use tracing::{error, info, warn};

use crate::models::resume::ResumeStatus;
use crate::resumes::store::ResumeStore;

/// Outcome of a best-effort "mark failed" write after a downstream failure.
///
/// Never converted into an error: the failure that triggered the compensation
/// is always the one reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    Applied,
    /// Record missing, `completed` or already `failed`.
    Skipped,
    Failed,
}

pub async fn mark_failed(store: &dyn ResumeStore, resume_id: i64, reason: &str) -> Compensation {
    match store.transition(resume_id, ResumeStatus::Failed).await {
        Ok(true) => {
            info!("Resume {resume_id} marked failed: {reason}");
            Compensation::Applied
        }
        Ok(false) => {
            warn!("Resume {resume_id} not marked failed (missing or finished): {reason}");
            Compensation::Skipped
        }
        Err(e) => {
            error!("Could not mark resume {resume_id} failed after '{reason}': {e}");
            Compensation::Failed
        }
    }
}
