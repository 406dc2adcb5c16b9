//! Reading progress database operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Reading progress record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReadingProgress {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub current_position: i64,
    pub last_read_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Progress repository
pub struct ProgressRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProgressRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get progress for a specific (user, book) pair
    pub async fn get(&self, user_id: &str, book_id: &str) -> Result<Option<ReadingProgress>> {
        let progress = sqlx::query_as::<_, ReadingProgress>(
            r#"
            SELECT id, user_id, book_id, current_position, last_read_at,
                   created_at, updated_at
            FROM reading_progress
            WHERE user_id = ? AND book_id = ?
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(progress)
    }

    /// The stored position for a book, or 0 when nothing is recorded yet
    pub async fn position(&self, user_id: &str, book_id: &str) -> Result<i64> {
        Ok(self
            .get(user_id, book_id)
            .await?
            .map(|p| p.current_position)
            .unwrap_or(0))
    }

    /// Update or create progress for a (user, book) pair.
    ///
    /// Idempotent upsert; an incoming write with an older `last_read_at`
    /// than the stored row is ignored, so duplicate or out-of-order
    /// persistence calls are safe.
    pub async fn upsert(
        &self,
        user_id: &str,
        book_id: &str,
        current_position: i64,
        last_read_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let last_read = last_read_at.to_rfc3339();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO reading_progress (id, user_id, book_id, current_position, last_read_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, book_id) DO UPDATE SET
                current_position = excluded.current_position,
                last_read_at = excluded.last_read_at,
                updated_at = excluded.updated_at
            WHERE excluded.last_read_at >= reading_progress.last_read_at
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(book_id)
        .bind(current_position)
        .bind(&last_read)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete progress for a (user, book) pair
    pub async fn delete(&self, user_id: &str, book_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM reading_progress
            WHERE user_id = ? AND book_id = ?
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
