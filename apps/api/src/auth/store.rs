use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::user::{NewUser, UserRow};

/// Persistence for user accounts. Carried in `AppState` as `Arc<dyn UserStore>`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Active users only.
    async fn find_active_by_username(&self, username: &str) -> Result<Option<UserRow>, AppError>;

    /// Any user (active or not) holding this username or email.
    async fn exists_with(&self, username: &str, email: &str) -> Result<bool, AppError>;

    /// Inserts a new user. A unique-index violation is reported as a
    /// validation error so a lost registration race looks like a duplicate.
    async fn insert(&self, user: NewUser<'_>) -> Result<UserRow, AppError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_active_by_username(&self, username: &str) -> Result<Option<UserRow>, AppError> {
        Ok(sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE username = $1 AND is_active = TRUE",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn exists_with(&self, username: &str, email: &str) -> Result<bool, AppError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert(&self, user: NewUser<'_>) -> Result<UserRow, AppError> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.hashed_password)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                AppError::Validation("Username or email already registered".to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}
