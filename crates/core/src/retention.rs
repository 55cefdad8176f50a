//! Exponential forgetting-curve model used by the progress display.
//!
//! Everything here is pure: it reads a stage and an elapsed time and never
//! touches stored progress.

use chrono::{DateTime, Utc};

use crate::model::{LevelProgress, Stage};
use crate::time::MILLIS_PER_DAY;

/// Approximate memory stability in days, indexed by stage 0..=6.
///
/// Hand-tuned against the review intervals (20 min .. 6 days).
pub const STABILITY_DAYS: [f64; 7] = [0.01, 0.04, 0.2, 0.5, 1.5, 3.5, 10.0];

/// Width of the curve display window.
pub const DISPLAY_WINDOW_DAYS: f64 = 7.0;

/// Number of segments the default curve is sampled with.
pub const CURVE_SEGMENTS: usize = 52;

/// Below this retention a started level is flagged as needing review.
pub const URGENT_RETENTION_PERCENT: f64 = 50.0;

#[must_use]
pub fn stability_days(stage: Stage) -> f64 {
    STABILITY_DAYS[usize::from(stage.value()).min(STABILITY_DAYS.len() - 1)]
}

/// Modeled recall percentage after `elapsed_days` at `stage`.
///
/// Returns `0` for stage 0. Negative or non-finite elapsed times count as 0.
#[must_use]
pub fn retention(stage: Stage, elapsed_days: f64) -> f64 {
    if stage.is_new() {
        return 0.0;
    }
    let t = if elapsed_days.is_finite() {
        elapsed_days.max(0.0)
    } else {
        0.0
    };
    100.0 * (-t / stability_days(stage)).exp()
}

/// One sampled point of the decay curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub elapsed_days: f64,
    pub retention: f64,
}

/// Sample the curve across the display window with `segments + 1` points.
#[must_use]
pub fn retention_curve(stage: Stage, segments: usize) -> Vec<CurvePoint> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let elapsed_days = DISPLAY_WINDOW_DAYS * i as f64 / segments as f64;
            CurvePoint {
                elapsed_days,
                retention: retention(stage, elapsed_days),
            }
        })
        .collect()
}

/// Days since the level was last played, or `0` if never played.
#[must_use]
pub fn elapsed_days(progress: &LevelProgress, now: DateTime<Utc>) -> f64 {
    if progress.last_played_millis() == 0 {
        return 0.0;
    }
    let delta_ms = now
        .timestamp_millis()
        .saturating_sub(progress.last_played_millis());
    #[allow(clippy::cast_precision_loss)]
    let days = delta_ms as f64 / MILLIS_PER_DAY as f64;
    days
}

/// Position of the "you are here" marker on the curve.
#[must_use]
pub fn current_position(progress: &LevelProgress, now: DateTime<Utc>) -> CurvePoint {
    let elapsed = elapsed_days(progress, now).clamp(0.0, DISPLAY_WINDOW_DAYS);
    CurvePoint {
        elapsed_days: elapsed,
        retention: retention(progress.stage(), elapsed),
    }
}
