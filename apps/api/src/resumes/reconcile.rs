use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::errors::AppError;
use crate::resumes::store::ResumeStore;

/// Fails every record left `pending` for longer than `max_age` as of `now`.
/// Run once at startup to clean up after a crash between insert and trigger.
pub async fn sweep_stale_pending(
    store: &dyn ResumeStore,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<u64, AppError> {
    let cutoff = now - max_age;
    let swept = store.fail_stale_pending(cutoff).await?;
    if swept > 0 {
        info!("Marked {swept} stale pending resume(s) failed (uploaded before {cutoff})");
    }
    Ok(swept)
}
