//! Reading progress endpoints
//!
//! Nested under the books router, so the paths are
//! `/api/v1/books/:id/progress`.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::ProgressRepository;
use crate::error::Result;
use crate::playback::PlaybackError;
use crate::routes::books::readable_book;
use crate::state::AppState;

/// Stored reading position for a (user, book) pair
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub book_id: String,
    pub current_position: i64,
    pub last_read_at: Option<String>,
}

/// Request body for saving a position
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub current_position: i64,
}

/// Create the progress router
pub fn router() -> Router<AppState> {
    Router::new().route("/:id/progress", get(get_progress).put(put_progress))
}

/// Get the caller's reading position for a book
async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProgressResponse>> {
    let book = readable_book(&state, &user, &id).await?;
    let progress = ProgressRepository::new(state.db())
        .get(&user.id, &book.id)
        .await?;

    Ok(Json(ProgressResponse {
        book_id: book.id,
        current_position: progress.as_ref().map(|p| p.current_position).unwrap_or(0),
        last_read_at: progress.map(|p| p.last_read_at),
    }))
}

/// Save the caller's reading position for a book
///
/// Positions beyond the end of the book are clamped to the word count.
async fn put_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateProgressRequest>,
) -> Result<Json<ProgressResponse>> {
    let book = readable_book(&state, &user, &id).await?;
    if body.current_position < 0 {
        return Err(PlaybackError::InvalidPosition(body.current_position).into());
    }
    let position = body.current_position.min(book.word_count);

    let repo = ProgressRepository::new(state.db());
    repo.upsert(&user.id, &book.id, position, Utc::now()).await?;
    let stored = repo.get(&user.id, &book.id).await?;

    Ok(Json(ProgressResponse {
        book_id: book.id,
        current_position: stored.as_ref().map(|p| p.current_position).unwrap_or(position),
        last_read_at: stored.map(|p| p.last_read_at),
    }))
}
