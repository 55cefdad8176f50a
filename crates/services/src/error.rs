//! Shared error types for the services crate.

use thiserror::Error;

use speedread_core::model::{RoundError, WordSetsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
///
/// Reads never fail (they fall back to defaults); only writes surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to encode progress: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors emitted by word-set classifiers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassifierError {
    #[error("classifier is not configured")]
    Disabled,
    #[error("no text or image to classify")]
    EmptyInput,
    #[error("classifier request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("classifier returned an empty response")]
    EmptyResponse,
    #[error("classifier returned malformed word sets: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    IncompleteWordSets(#[from] WordSetsError),
}

impl ClassifierError {
    /// Message suitable for showing to the player.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            ClassifierError::Disabled => "API Key not found",
            ClassifierError::EmptyInput => "請輸入文字或上載圖片。",
            _ => "處理失敗，請重試。",
        }
    }
}

/// Errors emitted by `RoundService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RoundServiceError {
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error("round is not complete yet")]
    Incomplete,
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error("invalid classifier base URL: {0}")]
    InvalidBaseUrl(String),
}
