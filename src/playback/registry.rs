//! Live playback session registry
//!
//! Owns the handles for every running session task. Sessions are looked
//! up per request, reclaimed when idle, and all persisted and stopped on
//! server shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ingest::WordSequence;

use super::session::{self, SessionHandle, SessionParams};
use super::sink::ProgressSink;
use super::types::{PlaybackConfig, PlaybackError, PlaybackSnapshot};

/// Registry of live playback sessions
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    sink: Arc<dyn ProgressSink>,
    flush_every: Duration,
    idle_timeout_secs: i64,
}

impl SessionRegistry {
    pub fn new(sink: Arc<dyn ProgressSink>, flush_every: Duration, idle_timeout_secs: i64) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: RwLock::new(HashMap::new()),
                sink,
                flush_every,
                idle_timeout_secs,
            }),
        }
    }

    /// Spawn a session task for `user_id` reading `book_id` and return
    /// its initial snapshot.
    pub async fn create(
        &self,
        user_id: String,
        book_id: String,
        words: Arc<WordSequence>,
        config: PlaybackConfig,
        initial_position: usize,
    ) -> Result<PlaybackSnapshot, PlaybackError> {
        let handle = session::spawn(SessionParams {
            user_id,
            book_id,
            words,
            config,
            initial_position,
            sink: self.inner.sink.clone(),
            flush_every: self.inner.flush_every,
        });
        let snapshot = handle.snapshot().await?;

        tracing::info!(
            session_id = %handle.id(),
            book_id = %handle.book_id(),
            "Created playback session"
        );
        self.inner
            .sessions
            .write()
            .await
            .insert(handle.id(), handle);

        Ok(snapshot)
    }

    /// Look up a live session.
    pub async fn get(&self, id: Uuid) -> Result<SessionHandle, PlaybackError> {
        self.inner
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(PlaybackError::SessionNotFound(id))
    }

    /// Stop a session, persisting its position.
    pub async fn end(&self, id: Uuid) -> Result<(), PlaybackError> {
        let handle = self
            .inner
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(PlaybackError::SessionNotFound(id))?;
        handle.shutdown().await;

        tracing::info!(session_id = %id, "Ended playback session");
        Ok(())
    }

    /// Stop every session belonging to `user_id`; used on logout.
    ///
    /// Returns the number of sessions ended.
    pub async fn end_for_user(&self, user_id: &str) -> usize {
        let removed = {
            let mut sessions = self.inner.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, handle)| handle.user_id() == user_id)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id))
                .collect::<Vec<_>>()
        };

        for handle in &removed {
            handle.shutdown().await;
        }
        removed.len()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Reclaim sessions with no activity for the configured timeout
    ///
    /// Returns the number of sessions cleaned up
    pub async fn cleanup_idle(&self) -> usize {
        let mut idle_ids = Vec::new();

        {
            let sessions = self.inner.sessions.read().await;
            for (id, handle) in sessions.iter() {
                if handle.is_idle(self.inner.idle_timeout_secs) {
                    idle_ids.push(*id);
                }
            }
        }

        let removed: Vec<SessionHandle> = {
            let mut sessions = self.inner.sessions.write().await;
            idle_ids
                .iter()
                .filter_map(|id| sessions.remove(id))
                .collect()
        };

        for handle in &removed {
            handle.shutdown().await;
        }
        if !removed.is_empty() {
            tracing::info!("Reclaimed {} idle playback sessions", removed.len());
        }
        removed.len()
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(300)); // 5 minutes

            loop {
                interval.tick().await;
                self.cleanup_idle().await;
            }
        })
    }

    /// Stop every live session so each persists its final position.
    pub async fn shutdown(&self) {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.inner.sessions.write().await;
            sessions.drain().map(|(_, handle)| handle).collect()
        };

        for handle in &handles {
            handle.shutdown().await;
        }
        if !handles.is_empty() {
            tracing::info!("Ended {} playback sessions at shutdown", handles.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::sink::test_support::RecordingSink;
    use crate::playback::types::{ControlCommand, PlaybackMode, PlaybackStatus};

    fn registry_with(sink: Arc<RecordingSink>, idle_timeout_secs: i64) -> SessionRegistry {
        SessionRegistry::new(sink, Duration::from_secs(60), idle_timeout_secs)
    }

    fn config() -> PlaybackConfig {
        PlaybackConfig::new(300, 1, PlaybackMode::Single)
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let registry = registry_with(Arc::new(RecordingSink::default()), 1800);
        let snapshot = registry
            .create(
                "u1".to_string(),
                "b1".to_string(),
                WordSequence::shared("one two three"),
                config(),
                1,
            )
            .await
            .unwrap();

        assert_eq!(snapshot.state, PlaybackStatus::Idle);
        assert_eq!(snapshot.cursor, 1);
        assert_eq!(snapshot.word_count, 3);

        let handle = registry.get(snapshot.session_id).await.unwrap();
        assert_eq!(handle.user_id(), "u1");
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let registry = registry_with(Arc::new(RecordingSink::default()), 1800);
        let id = Uuid::new_v4();
        assert!(matches!(
            registry.get(id).await,
            Err(PlaybackError::SessionNotFound(_))
        ));
        assert!(matches!(
            registry.end(id).await,
            Err(PlaybackError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_end_stops_and_removes_session() {
        let sink = Arc::new(RecordingSink::default());
        let registry = registry_with(sink.clone(), 1800);
        let snapshot = registry
            .create(
                "u1".to_string(),
                "b1".to_string(),
                WordSequence::shared("one two three"),
                config(),
                0,
            )
            .await
            .unwrap();

        let handle = registry.get(snapshot.session_id).await.unwrap();
        handle
            .control(ControlCommand::Seek { position: 2 })
            .await
            .unwrap();

        registry.end(snapshot.session_id).await.unwrap();
        settle().await;

        assert!(registry.get(snapshot.session_id).await.is_err());
        assert_eq!(registry.session_count().await, 0);
        assert_eq!(sink.positions().last(), Some(&2));
    }

    #[tokio::test]
    async fn test_end_for_user_leaves_other_users_alone() {
        let registry = registry_with(Arc::new(RecordingSink::default()), 1800);
        let words = WordSequence::shared("one two three");

        registry
            .create("u1".to_string(), "b1".to_string(), words.clone(), config(), 0)
            .await
            .unwrap();
        registry
            .create("u1".to_string(), "b2".to_string(), words.clone(), config(), 0)
            .await
            .unwrap();
        let other = registry
            .create("u2".to_string(), "b1".to_string(), words, config(), 0)
            .await
            .unwrap();

        assert_eq!(registry.end_for_user("u1").await, 2);
        assert_eq!(registry.session_count().await, 1);
        assert!(registry.get(other.session_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_reclaims_idle_sessions() {
        let registry = registry_with(Arc::new(RecordingSink::default()), 0);
        registry
            .create(
                "u1".to_string(),
                "b1".to_string(),
                WordSequence::shared("one two"),
                config(),
                0,
            )
            .await
            .unwrap();

        assert_eq!(registry.cleanup_idle().await, 1);
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_persists_every_session() {
        let sink = Arc::new(RecordingSink::default());
        let registry = registry_with(sink.clone(), 1800);
        let words = WordSequence::shared("one two three");

        // Started sessions are dirty but have not flushed yet; the paused
        // clock keeps any tick from firing before shutdown.
        let a = registry
            .create("u1".to_string(), "b1".to_string(), words.clone(), config(), 1)
            .await
            .unwrap();
        let b = registry
            .create("u2".to_string(), "b2".to_string(), words, config(), 2)
            .await
            .unwrap();
        for id in [a.session_id, b.session_id] {
            registry
                .get(id)
                .await
                .unwrap()
                .control(ControlCommand::Start { position: None })
                .await
                .unwrap();
        }

        registry.shutdown().await;
        settle().await;

        assert_eq!(registry.session_count().await, 0);
        let mut positions = sink.positions();
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 2]);
    }
}
