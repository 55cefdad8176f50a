use std::fmt;

use chrono::{DateTime, Utc};

use speedread_core::retention::{self, CURVE_SEGMENTS, CurvePoint, URGENT_RETENTION_PERCENT};
use speedread_core::scheduler;
use speedread_core::time::MILLIS_PER_MINUTE;
use speedread_core::{Level, LevelProgress, Stage};

const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

/// Where a level stands relative to its next review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    NotStarted,
    Due,
    Upcoming { hours: i64, minutes: i64 },
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::NotStarted => f.write_str("尚未開始"),
            ReviewStatus::Due => f.write_str("現在可以溫習了！"),
            ReviewStatus::Upcoming { hours, minutes } => {
                write!(f, "下次溫習: {hours}小時{minutes}分後")
            }
        }
    }
}

/// Everything the progress panel shows for one level.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub level: Level,
    pub stage: Stage,
    pub curve: Vec<CurvePoint>,
    pub current: CurvePoint,
    /// Next review time, anchored at the last session. `None` if never played.
    pub next_review_at: Option<DateTime<Utc>>,
    pub status: ReviewStatus,
    pub needs_urgent_review: bool,
    pub interval_label: String,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn build(progress: &LevelProgress, now: DateTime<Utc>) -> Self {
        let stage = progress.stage();
        let current = retention::current_position(progress, now);
        let next_review_at = progress
            .last_played_at()
            .map(|last| scheduler::next_review_date(stage, last));

        let status = match next_review_at {
            _ if stage.is_new() => ReviewStatus::NotStarted,
            None => ReviewStatus::Due,
            Some(at) => review_status(at, now),
        };

        Self {
            level: progress.level(),
            stage,
            curve: retention::retention_curve(stage, CURVE_SEGMENTS),
            current,
            next_review_at,
            status,
            needs_urgent_review: !stage.is_new() && current.retention < URGENT_RETENTION_PERCENT,
            interval_label: scheduler::next_review_interval_label(stage),
        }
    }
}

fn review_status(next_review_at: DateTime<Utc>, now: DateTime<Utc>) -> ReviewStatus {
    let remaining_ms = (next_review_at - now).num_milliseconds();
    if remaining_ms <= 0 {
        return ReviewStatus::Due;
    }
    ReviewStatus::Upcoming {
        hours: remaining_ms / MILLIS_PER_HOUR,
        minutes: (remaining_ms % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE,
    }
}
