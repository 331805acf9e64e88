//! Workflow trigger — the outbound call that hands a stored résumé to the
//! external analysis engine.
//!
//! One attempt per upload, no retries. Success means HTTP 200 with a JSON body;
//! that body is surfaced to the uploader as `workflow_result`.
//!
//! `AppState` holds an `Arc<dyn WorkflowTrigger>`, built at startup from config.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("workflow webhook failed: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to connect to workflow webhook: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("workflow webhook returned an unreadable body: {0}")]
    InvalidBody(#[source] reqwest::Error),
}

/// Payload sent to the analysis engine.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TriggerRequest {
    pub resume_id: i64,
    pub file_path: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    async fn trigger(&self, request: &TriggerRequest) -> Result<serde_json::Value, TriggerError>;
}

/// Posts the trigger payload as JSON to a webhook URL.
#[derive(Clone)]
pub struct WebhookTrigger {
    client: Client,
    url: String,
}

impl WebhookTrigger {
    /// `timeout: None` lets a hung engine block the upload request indefinitely.
    pub fn new(url: String, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url,
        })
    }
}

#[async_trait]
impl WorkflowTrigger for WebhookTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<serde_json::Value, TriggerError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(TriggerError::Connect)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Workflow webhook answered {} for resume {}",
                status, request.resume_id
            );
            return Err(TriggerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let result = response
            .json::<serde_json::Value>()
            .await
            .map_err(TriggerError::InvalidBody)?;

        info!("Workflow triggered for resume {}", request.resume_id);
        Ok(result)
    }
}
