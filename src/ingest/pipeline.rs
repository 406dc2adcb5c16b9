//! Book processing pipeline
//!
//! Drives one book through extraction: fetch the uploaded PDF from
//! object storage, extract and normalize its text, store the text, then
//! mark the row completed with its word count. Any failure marks the
//! book failed and the error is surfaced to whoever asked.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{Book, BookRepository, ProcessingStatus};
use crate::error::{AppError, Result};
use crate::ingest::{extract_text, normalize_text, tokenizer, IngestError};
use crate::storage::{self, ObjectStore};

pub const WELCOME_TITLE: &str = "Welcome to Flash Reader";
pub const WELCOME_AUTHOR: &str = "Flash Reader Team";

const WELCOME_TEXT: &str = "Welcome to Flash Reader!\n\n\
This is a modern web-based speed reading application that helps you read faster and more efficiently. You can:\n\
- Upload your own PDF files for reading\n\
- Adjust reading speed (WPM)\n\
- Toggle between single word and phrase mode\n\
- Track your progress\n\
- Use keyboard shortcuts for easy control\n\n\
Try adjusting the speed using the up/down arrow keys, or press space to start/pause reading.\n\n\
To upload your own PDF, return to the home page and use the upload button. Your PDF will be processed and made available for speed reading.\n\n\
Enjoy reading at your own pace!";

/// Ingestion service bound to the database and object store.
#[derive(Clone)]
pub struct IngestPipeline {
    db: SqlitePool,
    store: ObjectStore,
}

impl IngestPipeline {
    pub fn new(db: SqlitePool, store: ObjectStore) -> Self {
        Self { db, store }
    }

    /// Run the full pipeline for `book_id`, returning the updated row.
    pub async fn process_book(&self, book_id: &str) -> Result<Book> {
        let books = BookRepository::new(&self.db);
        let book = books.require(book_id).await?;
        let pdf_key = book
            .pdf_key
            .clone()
            .ok_or_else(|| AppError::BadRequest("Book has no PDF to process".to_string()))?;

        books.mark_processing(book_id).await?;
        tracing::info!(book_id = %book_id, "Extracting book text");

        match self.extract_and_store(book_id, &pdf_key).await {
            Ok(word_count) => {
                tracing::info!(book_id = %book_id, word_count, "Book processing complete");
                books.require(book_id).await
            }
            Err(e) => {
                tracing::warn!(book_id = %book_id, "Book processing failed: {}", e);
                if let Err(mark_err) = books.mark_failed(book_id).await {
                    tracing::error!(book_id = %book_id, "Failed to mark book failed: {}", mark_err);
                }
                Err(e)
            }
        }
    }

    async fn extract_and_store(&self, book_id: &str, pdf_key: &str) -> Result<i64> {
        let object = self.store.get(pdf_key).await?;
        let raw = extract_text(object.data).await?;
        let text = normalize_text(&raw);
        let word_count = tokenizer::count_words(&text) as i64;

        let text_key = storage::text_key(book_id);
        self.store
            .put(&text_key, text.into_bytes(), "text/plain; charset=utf-8")
            .await?;

        BookRepository::new(&self.db)
            .mark_completed(book_id, &text_key, word_count)
            .await?;

        Ok(word_count)
    }

    /// Process in the background; used right after upload so the request
    /// returns immediately with the book in `pending` state.
    pub fn spawn_process(&self, book_id: String) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.process_book(&book_id).await {
                tracing::warn!(book_id = %book_id, "Background processing failed: {}", e);
            }
        });
    }

    /// Return the book with its text guaranteed present in storage.
    ///
    /// Books that arrived failed or were never processed get one more
    /// attempt on demand. A book another task is currently processing is
    /// reported as a conflict so the client can poll its status instead.
    pub async fn ensure_ready(&self, book: Book) -> Result<Book> {
        match book.status() {
            ProcessingStatus::Completed => Ok(book),
            ProcessingStatus::Processing => Err(AppError::Conflict(
                "Book is still being processed".to_string(),
            )),
            ProcessingStatus::Pending | ProcessingStatus::Failed => {
                tracing::info!(book_id = %book.id, "Reprocessing book on demand");
                self.process_book(&book.id).await
            }
        }
    }

    /// Load the stored text for a ready book.
    pub async fn load_text(&self, book: &Book) -> Result<String> {
        let text_key = book
            .text_key
            .clone()
            .unwrap_or_else(|| storage::text_key(&book.id));
        let object = self.store.get(&text_key).await?;
        let text = String::from_utf8(object.data).map_err(|_| IngestError::CorruptText)?;
        Ok(text)
    }

    /// Seed a new user's library with the built-in welcome book.
    pub async fn seed_welcome_book(&self, owner_id: &str) -> Result<Book> {
        let book_id = Uuid::new_v4().to_string();
        let text_key = storage::text_key(&book_id);
        let word_count = tokenizer::count_words(WELCOME_TEXT) as i64;

        self.store
            .put(
                &text_key,
                WELCOME_TEXT.as_bytes().to_vec(),
                "text/plain; charset=utf-8",
            )
            .await?;

        BookRepository::new(&self.db)
            .insert_ready(
                &book_id,
                owner_id,
                WELCOME_TITLE,
                Some(WELCOME_AUTHOR),
                &text_key,
                word_count,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, UserRepository};
    use tempfile::TempDir;

    async fn test_pipeline() -> (IngestPipeline, TempDir) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_pool(&format!("sqlite:{}", db_path.display()))
            .await
            .unwrap();
        let store = ObjectStore::with_local(dir.path().join("objects"));
        (IngestPipeline::new(pool, store), dir)
    }

    async fn test_user(pipeline: &IngestPipeline) -> String {
        UserRepository::new(&pipeline.db)
            .create("reader@example.com", "reader", "salt$digest")
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_seed_welcome_book_is_ready() {
        let (pipeline, _dir) = test_pipeline().await;
        let owner = test_user(&pipeline).await;

        let book = pipeline.seed_welcome_book(&owner).await.unwrap();
        assert_eq!(book.status(), ProcessingStatus::Completed);
        assert!(book.word_count > 0);

        let text = pipeline.load_text(&book).await.unwrap();
        assert!(text.contains("Welcome to Flash Reader"));
    }

    #[tokio::test]
    async fn test_process_fails_on_garbage_pdf() {
        let (pipeline, _dir) = test_pipeline().await;
        let owner = test_user(&pipeline).await;

        let book_id = Uuid::new_v4().to_string();
        let pdf_key = storage::pdf_key(&book_id);
        pipeline
            .store
            .put(&pdf_key, b"not a pdf".to_vec(), "application/pdf")
            .await
            .unwrap();
        BookRepository::new(&pipeline.db)
            .insert(&book_id, &owner, "Broken", None, &pdf_key)
            .await
            .unwrap();

        assert!(pipeline.process_book(&book_id).await.is_err());

        let book = BookRepository::new(&pipeline.db)
            .require(&book_id)
            .await
            .unwrap();
        assert_eq!(book.status(), ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_ensure_ready_retries_failed_book() {
        let (pipeline, _dir) = test_pipeline().await;
        let owner = test_user(&pipeline).await;

        let book_id = Uuid::new_v4().to_string();
        let pdf_key = storage::pdf_key(&book_id);
        pipeline
            .store
            .put(&pdf_key, b"still not a pdf".to_vec(), "application/pdf")
            .await
            .unwrap();
        let book = BookRepository::new(&pipeline.db)
            .insert(&book_id, &owner, "Broken", None, &pdf_key)
            .await
            .unwrap();

        // Pending book with an unreadable PDF: retry happens, still fails.
        assert!(pipeline.ensure_ready(book).await.is_err());
    }
}
