//! Progress persistence seam
//!
//! Session tasks write positions through this trait instead of touching
//! the database directly, which keeps the actor testable without a pool
//! and keeps persistence failures isolated from playback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db::ProgressRepository;
use crate::error::Result;

/// Where playback sessions persist reading positions
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn save_position(
        &self,
        user_id: &str,
        book_id: &str,
        position: usize,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Sink backed by the reading_progress table
pub struct DbProgressSink {
    pool: SqlitePool,
}

impl DbProgressSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressSink for DbProgressSink {
    async fn save_position(
        &self,
        user_id: &str,
        book_id: &str,
        position: usize,
        at: DateTime<Utc>,
    ) -> Result<()> {
        ProgressRepository::new(&self.pool)
            .upsert(user_id, book_id, position as i64, at)
            .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Records every save so tests can assert on persistence boundaries.
    #[derive(Default)]
    pub struct RecordingSink {
        saves: Mutex<Vec<(String, String, usize)>>,
        fail: Mutex<bool>,
    }

    impl RecordingSink {
        pub fn saves(&self) -> Vec<(String, String, usize)> {
            self.saves.lock().unwrap().clone()
        }

        pub fn positions(&self) -> Vec<usize> {
            self.saves().into_iter().map(|(_, _, p)| p).collect()
        }

        pub fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn save_position(
            &self,
            user_id: &str,
            book_id: &str,
            position: usize,
            _at: DateTime<Utc>,
        ) -> Result<()> {
            if *self.fail.lock().unwrap() {
                return Err(crate::error::AppError::Internal(
                    "sink unavailable".to_string(),
                ));
            }
            self.saves
                .lock()
                .unwrap()
                .push((user_id.to_string(), book_id.to_string(), position));
            Ok(())
        }
    }
}
