//! Axum route handlers for `/auth`.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::extractor::AuthUser;
use crate::auth::password::{spawn_hash, spawn_verify};
use crate::errors::AppError;
use crate::models::user::{NewUser, UserProfile};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
}

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload?;
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password must not be empty".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Email address is invalid".to_string()));
    }

    if state.users.exists_with(username, email).await? {
        return Err(AppError::Validation(
            "Username or email already registered".to_string(),
        ));
    }

    let hashed_password = spawn_hash(req.password.clone()).await?;
    let user = state
        .users
        .insert(NewUser {
            username,
            email,
            hashed_password: &hashed_password,
        })
        .await?;

    info!("Registered user {} ({})", user.id, user.username);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user: user.into(),
        }),
    ))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(req) = payload?;

    let candidate = state.users.find_active_by_username(&req.username).await?;
    let verified = match candidate {
        Some(user) => spawn_verify(req.password.clone(), user.hashed_password.clone())
            .await?
            .then_some(user),
        None => None,
    };
    let user = verified.ok_or_else(|| {
        warn!("Failed login attempt for '{}'", req.username);
        AppError::Unauthorized("Incorrect username or password".to_string())
    })?;

    let access_token = state
        .tokens
        .issue(&user.username)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to issue token: {e}")))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// GET /auth/me
pub async fn handle_me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        is_active: user.is_active,
    })
}
