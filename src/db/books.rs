//! Book database operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// Lifecycle of a book's text extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingStatus::Pending),
            "processing" => Some(ProcessingStatus::Processing),
            "completed" => Some(ProcessingStatus::Completed),
            "failed" => Some(ProcessingStatus::Failed),
            _ => None,
        }
    }
}

/// Book record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub owner_id: String,
    pub pdf_key: Option<String>,
    pub text_key: Option<String>,
    pub word_count: i64,
    pub processing_status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Book {
    /// Parsed processing status; unknown values count as failed
    pub fn status(&self) -> ProcessingStatus {
        ProcessingStatus::parse(&self.processing_status).unwrap_or(ProcessingStatus::Failed)
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ProcessingStatus::Completed
    }
}

/// Book row joined with the requesting user's progress
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookWithProgress {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub owner_id: String,
    pub word_count: i64,
    pub processing_status: String,
    pub current_position: i64,
    pub created_at: String,
}

/// Book repository
pub struct BookRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BookRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a freshly uploaded book in `pending` state.
    ///
    /// The caller supplies the id because storage keys are derived
    /// from it before the row exists.
    pub async fn insert(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        author: Option<&str>,
        pdf_key: &str,
    ) -> Result<Book> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, owner_id, pdf_key, processing_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(author)
        .bind(owner_id)
        .bind(pdf_key)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.require(id).await
    }

    /// Insert a book whose text already exists in storage (no PDF source)
    pub async fn insert_ready(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        author: Option<&str>,
        text_key: &str,
        word_count: i64,
    ) -> Result<Book> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, owner_id, text_key, word_count, processing_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 'completed', ?, ?)
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(author)
        .bind(owner_id)
        .bind(text_key)
        .bind(word_count)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.require(id).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, owner_id, pdf_key, text_key, word_count,
                   processing_status, created_at, updated_at
            FROM books
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(book)
    }

    /// Get a book or fail with NotFound
    pub async fn require(&self, id: &str) -> Result<Book> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))
    }

    /// All books the user owns or holds in their library, newest first,
    /// joined with that user's reading position
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<BookWithProgress>> {
        let books = sqlx::query_as::<_, BookWithProgress>(
            r#"
            SELECT b.id, b.title, b.author, b.owner_id, b.word_count,
                   b.processing_status, b.created_at,
                   COALESCE(rp.current_position, 0) AS current_position
            FROM books b
            LEFT JOIN reading_progress rp
                   ON rp.book_id = b.id AND rp.user_id = ?
            WHERE b.owner_id = ?
               OR EXISTS (
                      SELECT 1 FROM user_library ul
                      WHERE ul.book_id = b.id AND ul.user_id = ?
                  )
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(books)
    }

    pub async fn mark_processing(&self, id: &str) -> Result<()> {
        self.set_status(id, "processing").await
    }

    pub async fn mark_failed(&self, id: &str) -> Result<()> {
        self.set_status(id, "failed").await
    }

    async fn set_status(&self, id: &str, status: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE books
            SET processing_status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Record a finished extraction
    pub async fn mark_completed(&self, id: &str, text_key: &str, word_count: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE books
            SET processing_status = 'completed', text_key = ?, word_count = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(text_key)
        .bind(word_count)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        sqlx::query("DELETE FROM user_library WHERE book_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        sqlx::query("DELETE FROM reading_progress WHERE book_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add a book to a user's library; idempotent
    pub async fn add_to_library(&self, user_id: &str, book_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_library (user_id, book_id, added_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove_from_library(&self, user_id: &str, book_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_library WHERE user_id = ? AND book_id = ?
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn in_library(&self, user_id: &str, book_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM user_library WHERE user_id = ? AND book_id = ?
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Whether a user may read a book: the owner, or anyone holding it
    /// in their library. Authorization is enforced here in the service
    /// layer, not by the datastore.
    pub async fn can_read(&self, book: &Book, user_id: &str) -> Result<bool> {
        if book.owner_id == user_id {
            return Ok(true);
        }
        self.in_library(user_id, &book.id).await
    }
}
