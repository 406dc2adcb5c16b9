//! Bearer-token request authentication

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::db::{AuthSessionRepository, User, UserRepository};
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated user behind the request's bearer token.
///
/// Extracting this rejects the request with 401 unless the token maps
/// to an unexpired login session.
pub struct AuthUser(pub User);

/// Pull the bearer token out of an Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let session = AuthSessionRepository::new(state.db())
            .find_valid(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let user = UserRepository::new(state.db())
            .find_by_id(&session.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

        Ok(AuthUser(user))
    }
}
