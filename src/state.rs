//! Application state management

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::ingest::IngestPipeline;
use crate::playback::{DbProgressSink, SessionRegistry};
use crate::storage::ObjectStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub config: Config,
    pub store: ObjectStore,
    pub db: SqlitePool,
    pub ingest: IngestPipeline,
    pub playback: SessionRegistry,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, store: ObjectStore, db: SqlitePool) -> Self {
        let ingest = IngestPipeline::new(db.clone(), store.clone());
        let sink = Arc::new(DbProgressSink::new(db.clone()));
        let playback = SessionRegistry::new(
            sink,
            Duration::from_secs(config.sessions.progress_flush_secs),
            config.sessions.idle_timeout_secs,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                db,
                ingest,
                playback,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the object store
    pub fn store(&self) -> &ObjectStore {
        &self.inner.store
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the ingestion pipeline
    pub fn ingest(&self) -> &IngestPipeline {
        &self.inner.ingest
    }

    /// Get the playback session registry
    pub fn playback(&self) -> &SessionRegistry {
        &self.inner.playback
    }

    /// Stop every live playback session so final positions persist.
    ///
    /// This should be called before the application exits.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down application state...");
        self.inner.playback.shutdown().await;
    }
}
