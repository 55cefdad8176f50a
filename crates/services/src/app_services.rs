use std::sync::Arc;

use storage::repository::Storage;
use tracing::debug;

use crate::Clock;
use crate::classifier::{ClassifierConfig, HttpWordSetClassifier, WordSetClassifier};
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::round_service::RoundService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    progress: Arc<ProgressService>,
    rounds: Arc<RoundService>,
    classifier: Arc<dyn WordSetClassifier>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// classifier base URL is invalid.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, clock)
    }

    /// Build services backed by in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the classifier base URL is invalid.
    pub fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    fn from_storage(storage: &Storage, clock: Clock) -> Result<Self, AppServicesError> {
        let config = ClassifierConfig::from_env()
            .map(ClassifierConfig::validate)
            .transpose()
            .map_err(AppServicesError::InvalidBaseUrl)?;
        let classifier = HttpWordSetClassifier::new(config);
        debug!(enabled = classifier.enabled(), "word-set classifier configured");
        Ok(Self::with_classifier(storage, clock, Arc::new(classifier)))
    }

    /// Build services with an explicit classifier (usually a test double).
    #[must_use]
    pub fn with_classifier(
        storage: &Storage,
        clock: Clock,
        classifier: Arc<dyn WordSetClassifier>,
    ) -> Self {
        let progress = ProgressService::new(clock, Arc::clone(&storage.kv));
        let rounds = Arc::new(RoundService::new(clock, progress.clone()));
        Self {
            clock,
            progress: Arc::new(progress),
            rounds,
            classifier,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn rounds(&self) -> Arc<RoundService> {
        Arc::clone(&self.rounds)
    }

    #[must_use]
    pub fn classifier(&self) -> Arc<dyn WordSetClassifier> {
        Arc::clone(&self.classifier)
    }
}
