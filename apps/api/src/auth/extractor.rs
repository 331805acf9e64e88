use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

const CREDENTIALS_ERROR: &str = "Could not validate credentials";

/// The authenticated caller. Adding this to a handler's arguments makes the
/// route require a valid `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserRow);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized(CREDENTIALS_ERROR.to_string()))?;

        let claims = state.tokens.validate(token).map_err(|e| {
            warn!("Rejected bearer token: {e}");
            AppError::Unauthorized(CREDENTIALS_ERROR.to_string())
        })?;

        let user = state
            .users
            .find_active_by_username(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!("Token subject '{}' is unknown or inactive", claims.sub);
                AppError::Unauthorized(CREDENTIALS_ERROR.to_string())
            })?;

        Ok(AuthUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
