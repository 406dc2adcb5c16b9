//! Route modules for Flash Reader Server

pub mod auth;
pub mod books;
pub mod playback;
pub mod progress;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the complete application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config().ingest.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/health", get(health_check))
        .nest("/api/v1/auth", auth::router())
        .nest(
            "/api/v1/books",
            books::router(max_upload_bytes).merge(progress::router()),
        )
        .nest("/api/v1/playback", playback::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::{Config, StorageProvider};
    use crate::db;
    use crate::storage::ObjectStore;

    async fn test_app() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.storage.provider = StorageProvider::Local;
        config.storage.local_dir = dir.path().join("objects").display().to_string();
        config.database.url = format!("sqlite:{}/test.db", dir.path().display());

        let store = ObjectStore::from_config(&config.storage).await.unwrap();
        let pool = db::create_pool(&config.database.url).await.unwrap();

        (app(AppState::new(config, store, pool)), dir)
    }

    #[tokio::test]
    async fn test_health_responds_without_auth() {
        let (app, _dir) = test_app().await;

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_require_bearer_token() {
        let (app, _dir) = test_app().await;

        let response = app
            .oneshot(Request::get("/api/v1/books").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (app, _dir) = test_app().await;

        let response = app
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
