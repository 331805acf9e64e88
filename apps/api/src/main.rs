mod auth;
mod config;
mod db;
mod errors;
mod models;
mod resumes;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{PgUserStore, TokenIssuer};
use crate::config::{Config, DEFAULT_SECRET_KEY};
use crate::db::{create_pool, run_migrations};
use crate::resumes::reconcile::sweep_stale_pending;
use crate::resumes::{FileReceiver, PgResumeStore, WebhookTrigger};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Intake API v{}", env!("CARGO_PKG_VERSION"));
    if config.secret_key == DEFAULT_SECRET_KEY {
        warn!("SECRET_KEY is the built-in default; set it before exposing this service");
    }

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    let resumes = Arc::new(PgResumeStore::new(db.clone()));
    let users = Arc::new(PgUserStore::new(db));

    if let Some(max_age) = config.stale_pending_after {
        sweep_stale_pending(resumes.as_ref(), max_age, chrono::Utc::now()).await?;
    }

    let mut files = FileReceiver::new(config.upload_dir.clone());
    files.ensure_dir().await?;
    info!("Storing uploads in {}", files.upload_dir().display());

    let trigger = WebhookTrigger::new(
        config.workflow_webhook_url.clone(),
        config.workflow_timeout,
    )?;
    match config.workflow_timeout {
        Some(timeout) => info!(
            "Workflow webhook: {} (timeout {}s)",
            config.workflow_webhook_url,
            timeout.as_secs()
        ),
        None => warn!(
            "Workflow webhook: {} with no timeout; a hung engine blocks uploads",
            config.workflow_webhook_url
        ),
    }

    // Build app state
    let state = AppState {
        tokens: TokenIssuer::from_config(&config),
        users,
        resumes,
        trigger: Arc::new(trigger),
        files,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
