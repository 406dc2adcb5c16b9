//! User and login-session database operations

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// User record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Login session record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthSession {
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user; the email must be unique
    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(&now)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict(format!(
                    "Email already registered: {}",
                    email
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created user".to_string()))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }
}

/// Login session repository
pub struct AuthSessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuthSessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a new bearer token for a user
    pub async fn create(&self, user_id: &str, ttl_days: i64) -> Result<AuthSession> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires = now + Duration::days(ttl_days);

        sqlx::query(
            r#"
            INSERT INTO auth_sessions (token, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(now.to_rfc3339())
        .bind(expires.to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id: user_id.to_string(),
            created_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
        })
    }

    /// Look up a session that has not expired yet
    pub async fn find_valid(&self, token: &str) -> Result<Option<AuthSession>> {
        let now = Utc::now().to_rfc3339();

        let session = sqlx::query_as::<_, AuthSession>(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM auth_sessions
            WHERE token = ? AND expires_at > ?
            "#,
        )
        .bind(token)
        .bind(&now)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Delete a session (logout)
    pub async fn delete(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop sessions past their expiry
    pub async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= ?")
            .bind(&now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
