//! Authentication endpoints
//!
//! Registration seeds the new account's library with the built-in
//! welcome book. Logout revokes the bearer token and stops any playback
//! sessions the user still has running.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthUser};
use crate::db::{AuthSessionRepository, User, UserRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// Token issued on register and login
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

/// Create the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Create an account, seed its library, and issue a token
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = request.email.trim().to_lowercase();
    let username = request.username.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest(
            "A valid email address is required".to_string(),
        ));
    }
    if username.is_empty() {
        return Err(AppError::BadRequest("A username is required".to_string()));
    }
    if request.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&request.password);
    let user = UserRepository::new(state.db())
        .create(&email, &username, &password_hash)
        .await?;
    tracing::info!(user_id = %user.id, "Registered new user");

    // The account is usable without the welcome book, so seeding
    // failures only get logged.
    if let Err(e) = state.ingest().seed_welcome_book(&user.id).await {
        tracing::warn!(user_id = %user.id, "Failed to seed welcome book: {}", e);
    }

    let session = AuthSessionRepository::new(state.db())
        .create(&user.id, state.config().auth.token_ttl_days)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token,
            expires_at: session.expires_at,
            user: user.into(),
        }),
    ))
}

/// Exchange credentials for a bearer token
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = request.email.trim().to_lowercase();

    let user = UserRepository::new(state.db())
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let sessions = AuthSessionRepository::new(state.db());
    sessions.purge_expired().await?;
    let session = sessions
        .create(&user.id, state.config().auth.token_ttl_days)
        .await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: user.into(),
    }))
}

/// Revoke the presented token and stop the user's playback sessions
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    AuthUser(user): AuthUser,
) -> Result<StatusCode> {
    if let Some(token) = auth::bearer_token(&headers) {
        AuthSessionRepository::new(state.db()).delete(token).await?;
    }

    let ended = state.playback().end_for_user(&user.id).await;
    tracing::info!(user_id = %user.id, playback_sessions = ended, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated user's own profile
async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}
