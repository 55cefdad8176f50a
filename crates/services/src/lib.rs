#![forbid(unsafe_code)]

pub mod app_services;
pub mod classifier;
pub mod error;
pub mod progress_service;
pub mod progress_view;
pub mod reminder;
pub mod round_service;

pub use speedread_core::Clock;

pub use app_services::AppServices;
pub use classifier::{
    ClassifierConfig, ClassifierInput, HttpWordSetClassifier, ImageInput, WordSetClassifier,
};
pub use error::{AppServicesError, ClassifierError, ProgressServiceError, RoundServiceError};
pub use progress_service::{PROGRESS_KEY, ProgressService};
pub use progress_view::{ProgressSnapshot, ReviewStatus};
pub use reminder::CalendarReminder;
pub use round_service::{RoundOutcome, RoundService};
