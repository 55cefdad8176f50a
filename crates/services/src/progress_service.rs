use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use speedread_core::{AllProgress, Clock, Level};
use storage::repository::KeyValueStore;

use crate::error::ProgressServiceError;

/// Key the whole progress blob is stored under.
pub const PROGRESS_KEY: &str = "smart_speed_reading_progress";

/// Loads, updates and resets per-level review progress.
///
/// Progress is stored as a single JSON blob. Reads fail open: a missing,
/// unreadable or corrupt blob yields fresh defaults instead of an error.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn KeyValueStore>) -> Self {
        Self { clock, store }
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Load persisted progress, or defaults for every level.
    pub async fn load(&self) -> AllProgress {
        let raw = match self.store.get(PROGRESS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return AllProgress::default(),
            Err(err) => {
                warn!(error = %err, "progress read failed, using defaults");
                return AllProgress::default();
            }
        };

        match serde_json::from_str::<AllProgress>(&raw) {
            Ok(mut progress) => {
                if progress.normalize() {
                    debug!("repaired level tags in persisted progress");
                }
                progress
            }
            Err(err) => {
                warn!(error = %err, "persisted progress is corrupt, using defaults");
                AllProgress::default()
            }
        }
    }

    /// Delete all persisted progress. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the backend rejects the delete.
    pub async fn reset(&self) -> Result<(), ProgressServiceError> {
        self.store.delete(PROGRESS_KEY).await?;
        info!("progress reset");
        Ok(())
    }

    /// Record a completed session for `level` and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the updated progress cannot be
    /// encoded or stored.
    pub async fn record_session(
        &self,
        level: Level,
        completed_at: DateTime<Utc>,
    ) -> Result<AllProgress, ProgressServiceError> {
        let mut progress = self.load().await;
        let transition = progress.record_session(level, completed_at);

        debug!(
            %level,
            from = %transition.from,
            to = %transition.to,
            elapsed_minutes = ?transition.elapsed_minutes,
            qualifying = transition.qualifying,
            "session recorded"
        );

        self.save(&progress).await?;
        Ok(progress)
    }

    /// Record a session completed right now.
    ///
    /// # Errors
    ///
    /// See [`ProgressService::record_session`].
    pub async fn record_session_now(&self, level: Level) -> Result<AllProgress, ProgressServiceError> {
        self.record_session(level, self.now()).await
    }

    async fn save(&self, progress: &AllProgress) -> Result<(), ProgressServiceError> {
        let encoded = serde_json::to_string(progress)?;
        self.store.set(PROGRESS_KEY, &encoded).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use speedread_core::time::fixed_now;
    use speedread_core::{LevelProgress, Stage};
    use storage::repository::{InMemoryStore, StorageError};

    fn service(store: &InMemoryStore) -> ProgressService {
        ProgressService::new(Clock::fixed(fixed_now()), Arc::new(store.clone()))
    }

    /// Backend whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    #[tokio::test]
    async fn load_without_data_yields_defaults() {
        let store = InMemoryStore::new();
        let progress = service(&store).load().await;
        assert_eq!(progress, AllProgress::default());
        // Reading does not write anything back.
        assert_eq!(store.get(PROGRESS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_blob_fails_open() {
        let store = InMemoryStore::new();
        store.set(PROGRESS_KEY, "{not json").await.unwrap();
        assert_eq!(service(&store).load().await, AllProgress::default());

        store
            .set(PROGRESS_KEY, r#"{"A":{"level":"A","stage":"two"}}"#)
            .await
            .unwrap();
        assert_eq!(service(&store).load().await, AllProgress::default());
    }

    #[tokio::test]
    async fn backend_read_failure_fails_open() {
        let svc = ProgressService::new(Clock::fixed(fixed_now()), Arc::new(BrokenStore));
        assert_eq!(svc.load().await, AllProgress::default());
    }

    #[tokio::test]
    async fn backend_write_failure_is_reported() {
        let svc = ProgressService::new(Clock::fixed(fixed_now()), Arc::new(BrokenStore));
        let err = svc.record_session(Level::A, fixed_now()).await.unwrap_err();
        assert!(matches!(err, ProgressServiceError::Storage(_)));
        assert!(svc.reset().await.is_err());
    }

    #[tokio::test]
    async fn first_session_promotes_to_stage_one() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let progress = svc.record_session(Level::C, fixed_now()).await.unwrap();

        let c = progress.get(Level::C);
        assert_eq!(c.stage().value(), 1);
        assert_eq!(c.last_played_millis(), fixed_now().timestamp_millis());
        assert_eq!(c.history().len(), 1);
        assert_eq!(progress.get(Level::A), &LevelProgress::new(Level::A));

        assert_eq!(svc.load().await, progress);
    }

    #[tokio::test]
    async fn stage_two_to_three_after_thirty_five_minutes() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let t = fixed_now();
        let seeded = r#"{"A":{"level":"A","lastPlayed":LAST,"stage":2,"history":[LAST]}}"#
            .replace("LAST", &t.timestamp_millis().to_string());
        store.set(PROGRESS_KEY, &seeded).await.unwrap();

        let later = t + Duration::minutes(35);
        let progress = svc.record_session(Level::A, later).await.unwrap();
        let a = progress.get(Level::A);
        assert_eq!(a.stage().value(), 3);
        assert_eq!(a.last_played_millis(), later.timestamp_millis());
        assert_eq!(a.history().len(), 2);
    }

    #[tokio::test]
    async fn rapid_replays_do_not_inflate_stage() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let t0 = fixed_now();
        svc.record_session(Level::B, t0).await.unwrap();

        let mut last = None;
        for i in 1..=5 {
            last = Some(svc.record_session(Level::B, t0 + Duration::minutes(i)).await.unwrap());
        }
        let b = last.unwrap();
        let b = b.get(Level::B);
        assert_eq!(b.stage().value(), 1);
        assert_eq!(b.history().len(), 6);
    }

    #[tokio::test]
    async fn stage_never_exceeds_six() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let mut t = fixed_now();
        for _ in 0..12 {
            svc.record_session(Level::A, t).await.unwrap();
            t += Duration::days(10);
        }
        let progress = svc.load().await;
        assert_eq!(progress.get(Level::A).stage(), Stage::MAX);
        assert_eq!(progress.get(Level::A).history().len(), 12);
    }

    #[tokio::test]
    async fn reset_restores_defaults_and_is_idempotent() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        svc.record_session_now(Level::A).await.unwrap();
        svc.record_session_now(Level::B).await.unwrap();

        svc.reset().await.unwrap();
        svc.reset().await.unwrap();
        assert_eq!(svc.load().await, AllProgress::default());
    }

    #[tokio::test]
    async fn out_of_range_stage_is_clamped_on_load() {
        let store = InMemoryStore::new();
        store
            .set(
                PROGRESS_KEY,
                r#"{"B":{"level":"A","lastPlayed":1,"stage":11,"history":[1]}}"#,
            )
            .await
            .unwrap();
        let progress = service(&store).load().await;
        let b = progress.get(Level::B);
        assert_eq!(b.stage(), Stage::MAX);
        assert_eq!(b.level(), Level::B);
    }

    #[tokio::test]
    async fn extreme_last_played_still_records() {
        let store = InMemoryStore::new();
        store
            .set(
                PROGRESS_KEY,
                r#"{"A":{"level":"A","lastPlayed":-9223372036854775808,"stage":2,"history":[]}}"#,
            )
            .await
            .unwrap();
        let svc = service(&store);
        let progress = svc.record_session(Level::A, fixed_now()).await.unwrap();
        let a = progress.get(Level::A);
        assert_eq!(a.stage().value(), 3);
        assert_eq!(a.last_played_millis(), fixed_now().timestamp_millis());
    }
}
