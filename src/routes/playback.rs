//! Playback session endpoints
//!
//! Sessions are live server-side actors; these handlers create them,
//! forward control commands, and stream display frames over SSE.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::{ProgressRepository, User};
use crate::error::{AppError, Result};
use crate::ingest::WordSequence;
use crate::playback::{
    ControlCommand, PlaybackConfig, PlaybackMode, PlaybackSnapshot, SessionEvent, SessionHandle,
    DEFAULT_PHRASE_SIZE, DEFAULT_WPM,
};
use crate::routes::books::readable_book;
use crate::state::AppState;

/// Request body for creating a playback session
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaybackRequest {
    pub book_id: String,
    pub words_per_minute: Option<u32>,
    pub phrase_size: Option<usize>,
    pub mode: Option<PlaybackMode>,
}

/// Create the playback router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/:id", get(get_session).delete(end_session))
        .route("/:id/control", post(control_session))
        .route("/:id/events", get(session_events))
}

/// Look up a live session, rejecting callers who do not own it.
async fn owned_session(state: &AppState, user: &User, id: Uuid) -> Result<SessionHandle> {
    let handle = state.playback().get(id).await?;
    if handle.user_id() != user.id {
        return Err(AppError::Forbidden(
            "You do not have access to this playback session".to_string(),
        ));
    }
    Ok(handle)
}

/// Create a playback session for a book
///
/// The session starts idle at the caller's saved reading position.
async fn create_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreatePlaybackRequest>,
) -> Result<(StatusCode, Json<PlaybackSnapshot>)> {
    let book = readable_book(&state, &user, &body.book_id).await?;
    let book = state.ingest().ensure_ready(book).await?;
    let text = state.ingest().load_text(&book).await?;
    let words = WordSequence::shared(&text);

    let config = PlaybackConfig::new(
        body.words_per_minute.unwrap_or(DEFAULT_WPM),
        body.phrase_size.unwrap_or(DEFAULT_PHRASE_SIZE),
        body.mode.unwrap_or(PlaybackMode::Single),
    );
    let saved = ProgressRepository::new(state.db())
        .position(&user.id, &book.id)
        .await?;
    let initial_position = usize::try_from(saved).unwrap_or(0);

    let snapshot = state
        .playback()
        .create(user.id.clone(), book.id, words, config, initial_position)
        .await?;

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Get the current state of a session
async fn get_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PlaybackSnapshot>> {
    let handle = owned_session(&state, &user, id).await?;
    Ok(Json(handle.snapshot().await?))
}

/// Apply a control command and return the resulting state
async fn control_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(command): Json<ControlCommand>,
) -> Result<Json<PlaybackSnapshot>> {
    let handle = owned_session(&state, &user, id).await?;
    Ok(Json(handle.control(command).await?))
}

/// End a session, persisting its final position
async fn end_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    owned_session(&state, &user, id).await?;
    state.playback().end(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stream display frames for a session over SSE
///
/// Each frame is sent as a `frame` event. Ending the session (delete,
/// logout, idle sweep, shutdown) emits a final `end` event and closes
/// the stream. Includes a keep-alive ping every 30 seconds to prevent
/// proxy timeouts.
async fn session_events(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>> + Send + 'static>> {
    let handle = owned_session(&state, &user, id).await?;
    let receiver = handle.subscribe();

    let stream = BroadcastStream::new(receiver).filter_map(move |result| match result {
        Ok(SessionEvent::Frame(frame)) => match Event::default().event("frame").json_data(&frame)
        {
            Ok(event) => Some(Ok::<_, Infallible>(event)),
            Err(e) => {
                tracing::warn!("Failed to serialize playback frame: {}", e);
                None
            }
        },
        Ok(SessionEvent::Ended) => Some(Ok(Event::default().event("end").data("end"))),
        Err(e) => {
            tracing::debug!(session_id = %id, "Playback frame stream lagged: {}", e);
            None
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(30))
            .text("ping"),
    ))
}
