//! Book API endpoints
//!
//! Provides REST API for book management:
//! - Upload PDFs for background text extraction
//! - List and inspect books
//! - Read extracted content and processing status
//! - Download the original PDF
//! - Share books between libraries by id

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{Book, BookRepository, ProgressRepository, User};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage;

/// Response for book list
#[derive(Serialize)]
pub struct BookListResponse {
    pub books: Vec<BookSummary>,
    pub total: usize,
}

/// Summary of a book for list view
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub word_count: i64,
    pub processing_status: String,
    pub current_position: i64,
    pub is_owner: bool,
    pub created_at: String,
}

/// Full book details response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetailResponse {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub word_count: i64,
    pub processing_status: String,
    pub current_position: i64,
    pub is_owner: bool,
    pub created_at: String,
}

/// Processing status response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub id: String,
    pub processing_status: String,
    pub word_count: i64,
}

/// Extracted text response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub id: String,
    pub content: String,
    pub word_count: i64,
    pub current_position: i64,
}

/// Upload response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: String,
    pub title: String,
    pub processing_status: String,
    pub message: String,
}

/// Create the books router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list_books).post(upload_book))
        .route("/:id", get(get_book).delete(delete_book))
        .route("/:id/status", get(book_status))
        .route("/:id/content", get(book_content))
        .route("/:id/file", get(book_file))
        .route("/:id/library", post(add_to_library).delete(remove_from_library))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Fetch a book and reject readers who neither own it nor hold it in
/// their library.
pub(crate) async fn readable_book(state: &AppState, user: &User, id: &str) -> Result<Book> {
    let books = BookRepository::new(state.db());
    let book = books.require(id).await?;
    if !books.can_read(&book, &user.id).await? {
        return Err(AppError::Forbidden(
            "You do not have access to this book".to_string(),
        ));
    }
    Ok(book)
}

/// List the user's books, newest first
async fn list_books(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<BookListResponse>> {
    let books = BookRepository::new(state.db())
        .list_for_user(&user.id)
        .await?;

    let summaries: Vec<BookSummary> = books
        .into_iter()
        .map(|book| BookSummary {
            is_owner: book.owner_id == user.id,
            id: book.id,
            title: book.title,
            author: book.author,
            word_count: book.word_count,
            processing_status: book.processing_status,
            current_position: book.current_position,
            created_at: book.created_at,
        })
        .collect();

    let total = summaries.len();

    Ok(Json(BookListResponse {
        books: summaries,
        total,
    }))
}

/// Upload a new PDF book
async fn upload_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut title: Option<String> = None;
    let mut author: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            "title" => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read title: {}", e)))?,
                );
            }
            "author" => {
                author = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read author: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| {
        AppError::BadRequest("No file provided. Use field name 'file'".to_string())
    })?;

    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(AppError::BadRequest(
            "Only PDF files are supported".to_string(),
        ));
    }
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    // A file named exactly ".pdf" has an empty stem.
    let stem = filename[..filename.len() - 4].trim();
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| {
            if stem.is_empty() {
                "Untitled".to_string()
            } else {
                stem.to_string()
            }
        });
    let author = author
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    let book_id = Uuid::new_v4().to_string();
    let pdf_key = storage::pdf_key(&book_id);
    let size = data.len();

    state
        .store()
        .put(&pdf_key, data, "application/pdf")
        .await?;
    let book = BookRepository::new(state.db())
        .insert(&book_id, &user.id, &title, author.as_deref(), &pdf_key)
        .await?;

    tracing::info!(book_id = %book.id, user_id = %user.id, size, "Uploaded new book");
    state.ingest().spawn_process(book.id.clone());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            id: book.id,
            title: book.title,
            processing_status: book.processing_status,
            message: "Book uploaded and queued for processing".to_string(),
        }),
    ))
}

/// Get book details by ID
async fn get_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<BookDetailResponse>> {
    let book = readable_book(&state, &user, &id).await?;
    let current_position = ProgressRepository::new(state.db())
        .position(&user.id, &book.id)
        .await?;

    Ok(Json(BookDetailResponse {
        is_owner: book.owner_id == user.id,
        id: book.id,
        title: book.title,
        author: book.author,
        word_count: book.word_count,
        processing_status: book.processing_status,
        current_position,
        created_at: book.created_at,
    }))
}

/// Delete a book, its stored objects, and all related rows
async fn delete_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let books = BookRepository::new(state.db());
    let book = books.require(&id).await?;
    if book.owner_id != user.id {
        return Err(AppError::Forbidden(
            "Only the owner can delete a book".to_string(),
        ));
    }

    for key in [&book.pdf_key, &book.text_key].into_iter().flatten() {
        if let Err(e) = state.store().delete(key).await {
            tracing::warn!(book_id = %id, key = %key, "Failed to delete stored object: {}", e);
        }
    }
    books.delete(&id).await?;

    tracing::info!(book_id = %id, user_id = %user.id, "Deleted book");
    Ok(StatusCode::NO_CONTENT)
}

/// Get extraction status for a book
async fn book_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>> {
    let book = readable_book(&state, &user, &id).await?;

    Ok(Json(StatusResponse {
        id: book.id,
        processing_status: book.processing_status,
        word_count: book.word_count,
    }))
}

/// Get the extracted text of a book
///
/// Books whose extraction never ran or failed get one retry here, so a
/// transient failure does not permanently wedge the book.
async fn book_content(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ContentResponse>> {
    let book = readable_book(&state, &user, &id).await?;
    let book = state.ingest().ensure_ready(book).await?;
    let content = state.ingest().load_text(&book).await?;
    let current_position = ProgressRepository::new(state.db())
        .position(&user.id, &book.id)
        .await?;

    Ok(Json(ContentResponse {
        id: book.id,
        content,
        word_count: book.word_count,
        current_position,
    }))
}

/// Download the original PDF
async fn book_file(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Response> {
    let book = readable_book(&state, &user, &id).await?;
    let pdf_key = book
        .pdf_key
        .ok_or_else(|| AppError::NotFound("This book has no PDF file".to_string()))?;

    let object = state.store().get(&pdf_key).await?;
    let filename = safe_filename(&book.title);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, object.data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}.pdf\"", filename),
        )
        .body(Body::from(object.data))
        .map_err(|e| AppError::Internal(format!("Failed to build file response: {}", e)))
}

/// Add a book to the caller's library
///
/// Knowing a book's id is the sharing capability; ids are random UUIDs
/// handed out by owners.
async fn add_to_library(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let books = BookRepository::new(state.db());
    let book = books.require(&id).await?;
    books.add_to_library(&user.id, &book.id).await?;

    tracing::debug!(book_id = %id, user_id = %user.id, "Added book to library");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a book from the caller's library
async fn remove_from_library(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let books = BookRepository::new(state.db());
    books.require(&id).await?;

    if !books.remove_from_library(&user.id, &id).await? {
        return Err(AppError::NotFound(
            "Book is not in your library".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn safe_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "book".to_string()
    } else {
        trimmed.to_string()
    }
}
