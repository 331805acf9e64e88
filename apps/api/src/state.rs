use std::sync::Arc;

use crate::auth::{TokenIssuer, UserStore};
use crate::config::Config;
use crate::resumes::{FileReceiver, ResumeStore, WorkflowTrigger};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub resumes: Arc<dyn ResumeStore>,
    /// Outbound notifier for the analysis engine. Default: `WebhookTrigger`.
    pub trigger: Arc<dyn WorkflowTrigger>,
    pub files: FileReceiver,
    pub tokens: TokenIssuer,
}
