use chrono::{DateTime, Duration, Utc};

use crate::model::{LevelProgress, Stage};
use crate::time::MILLIS_PER_MINUTE;

//
// ─── SCHEDULE ──────────────────────────────────────────────────────────────────
//

/// Review intervals in minutes, indexed by the stage being advanced from.
///
/// 20 min, 1 h, 9 h, 1 day, 2 days, 6 days.
pub const REVIEW_INTERVALS_MINUTES: [u32; 6] = [20, 60, 540, 1440, 2880, 8640];

/// Fraction of the target interval that must have elapsed for a session to
/// count as a qualifying review.
pub const QUALIFYING_FRACTION: f64 = 0.5;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 1440;

//
// ─── STAGE TRANSITION ──────────────────────────────────────────────────────────
//

/// Result of applying one completed session to a level's stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    /// Minutes since the previous session, `None` for a first completion.
    pub elapsed_minutes: Option<f64>,
    /// Whether the session advanced (or would have advanced, at the ceiling)
    /// the schedule.
    pub qualifying: bool,
}

impl StageTransition {
    #[must_use]
    pub fn advanced(&self) -> bool {
        self.to > self.from
    }
}

/// Target interval that must (half-)elapse before advancing past `stage`.
///
/// Stage 0 has no gate; stages above 6 use the last interval.
#[must_use]
pub fn gate_interval_minutes(stage: Stage) -> Option<u32> {
    if stage.is_new() {
        return None;
    }
    let idx = usize::from(stage.value() - 1).min(REVIEW_INTERVALS_MINUTES.len() - 1);
    Some(REVIEW_INTERVALS_MINUTES[idx])
}

/// Decide the stage after a session completed at `now`.
///
/// - Stage 0 always moves to 1.
/// - Otherwise the stage advances by one (capped at 6) when at least half of
///   the gate interval has passed since `last_played`; earlier sessions are
///   practice and leave the stage unchanged.
#[must_use]
pub fn transition(current: &LevelProgress, now: DateTime<Utc>) -> StageTransition {
    let from = current.stage();

    let Some(target) = gate_interval_minutes(from) else {
        return StageTransition {
            from,
            to: from.next(),
            elapsed_minutes: None,
            qualifying: true,
        };
    };

    let elapsed_ms = now
        .timestamp_millis()
        .saturating_sub(current.last_played_millis());
    // Millisecond deltas on human timescales fit comfortably in an f64 mantissa.
    #[allow(clippy::cast_precision_loss)]
    let elapsed_minutes = elapsed_ms as f64 / MILLIS_PER_MINUTE as f64;
    let qualifying = elapsed_minutes >= f64::from(target) * QUALIFYING_FRACTION;

    StageTransition {
        from,
        to: if qualifying { from.next() } else { from },
        elapsed_minutes: Some(elapsed_minutes),
        qualifying,
    }
}

//
// ─── NEXT REVIEW ───────────────────────────────────────────────────────────────
//

/// Interval to the next review after reaching `stage`.
///
/// Stages at or above 5 share the final 6-day interval.
#[must_use]
pub fn next_review_interval_minutes(stage: Stage) -> u32 {
    let idx = usize::from(stage.value()).min(REVIEW_INTERVALS_MINUTES.len() - 1);
    REVIEW_INTERVALS_MINUTES[idx]
}

/// `now` plus the next interval, saturating at the latest representable time.
#[must_use]
pub fn next_review_date(stage: Stage, now: DateTime<Utc>) -> DateTime<Utc> {
    let interval = Duration::minutes(i64::from(next_review_interval_minutes(stage)));
    now.checked_add_signed(interval)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Human-readable interval label, e.g. `20分鐘`, `9小時`, `1天`.
#[must_use]
pub fn next_review_interval_label(stage: Stage) -> String {
    format_interval_label(next_review_interval_minutes(stage))
}

/// Formats minutes as minutes (< 1 h), whole hours (< 1 day) or whole days.
/// Units are floored, never rounded.
#[must_use]
pub fn format_interval_label(minutes: u32) -> String {
    if minutes < MINUTES_PER_HOUR {
        format!("{minutes}分鐘")
    } else if minutes < MINUTES_PER_DAY {
        format!("{}小時", minutes / MINUTES_PER_HOUR)
    } else {
        format!("{}天", minutes / MINUTES_PER_DAY)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Level;
    use crate::time::fixed_now;

    fn at_stage(stage: i64, last_played: DateTime<Utc>) -> LevelProgress {
        LevelProgress::from_persisted(
            Level::A,
            last_played.timestamp_millis(),
            stage,
            vec![last_played.timestamp_millis()],
        )
    }

    #[test]
    fn first_completion_always_promotes() {
        let fresh = LevelProgress::new(Level::B);
        let t = transition(&fresh, fixed_now());
        assert_eq!(t.from, Stage::NEW);
        assert_eq!(t.to.value(), 1);
        assert!(t.advanced());
        assert_eq!(t.elapsed_minutes, None);

        // Even at the epoch itself.
        let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        assert_eq!(transition(&fresh, epoch).to.value(), 1);
    }

    #[test]
    fn half_interval_gate_for_every_stage() {
        let last = fixed_now();
        for stage in 1..6_i64 {
            let progress = at_stage(stage, last);
            let target = REVIEW_INTERVALS_MINUTES[usize::try_from(stage - 1).unwrap()];
            let half_ms = i64::from(target) * MILLIS_PER_MINUTE / 2;

            let on_time = last + Duration::milliseconds(half_ms);
            assert_eq!(transition(&progress, on_time).to.value(), u8::try_from(stage + 1).unwrap());

            let early = last + Duration::milliseconds(half_ms - 1);
            let t = transition(&progress, early);
            assert_eq!(t.to, t.from);
            assert!(!t.qualifying);
        }
    }

    #[test]
    fn stage_six_is_terminal() {
        let last = fixed_now();
        let progress = at_stage(6, last);
        let t = transition(&progress, last + Duration::days(30));
        assert!(t.qualifying);
        assert_eq!(t.to, Stage::MAX);
        assert!(!t.advanced());
    }

    #[test]
    fn stage_two_advances_after_thirty_five_minutes() {
        let last = fixed_now();
        let progress = at_stage(2, last);
        let t = transition(&progress, last + Duration::minutes(35));
        assert_eq!(t.to.value(), 3);
        assert_eq!(t.elapsed_minutes, Some(35.0));
    }

    #[test]
    fn clock_going_backwards_is_not_qualifying() {
        let last = fixed_now();
        let progress = at_stage(3, last);
        let t = transition(&progress, last - Duration::hours(1));
        assert_eq!(t.to.value(), 3);
    }

    #[test]
    fn gate_interval_lookup() {
        assert_eq!(gate_interval_minutes(Stage::NEW), None);
        assert_eq!(gate_interval_minutes(Stage::new(1)), Some(20));
        assert_eq!(gate_interval_minutes(Stage::new(6)), Some(8640));
    }

    #[test]
    fn next_interval_clamps_to_table() {
        assert_eq!(next_review_interval_minutes(Stage::NEW), 20);
        assert_eq!(next_review_interval_minutes(Stage::new(4)), 2880);
        assert_eq!(next_review_interval_minutes(Stage::new(5)), 8640);
        assert_eq!(next_review_interval_minutes(Stage::MAX), 8640);
    }

    #[test]
    fn next_review_date_adds_interval() {
        let now = fixed_now();
        assert_eq!(next_review_date(Stage::new(2), now), now + Duration::hours(9));
        assert_eq!(next_review_date(Stage::new(6), now), now + Duration::days(6));
    }

    #[test]
    fn next_review_date_saturates_near_max_time() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);
        assert_eq!(next_review_date(Stage::new(6), late), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn extreme_last_played_does_not_overflow() {
        let ancient = LevelProgress::from_persisted(Level::A, i64::MIN, 2, vec![]);
        let t = transition(&ancient, fixed_now());
        assert!(t.qualifying);
        assert_eq!(t.to.value(), 3);

        let future = LevelProgress::from_persisted(Level::A, i64::MAX, 2, vec![]);
        let t = transition(&future, fixed_now());
        assert!(!t.qualifying);
        assert_eq!(t.to.value(), 2);
    }

    #[test]
    fn interval_labels() {
        assert_eq!(next_review_interval_label(Stage::new(0)), "20分鐘");
        assert_eq!(next_review_interval_label(Stage::new(1)), "1小時");
        assert_eq!(next_review_interval_label(Stage::new(2)), "9小時");
        assert_eq!(next_review_interval_label(Stage::new(3)), "1天");
        assert_eq!(next_review_interval_label(Stage::new(4)), "2天");
        assert_eq!(next_review_interval_label(Stage::new(5)), "6天");
    }

    #[test]
    fn label_floors_units() {
        assert_eq!(format_interval_label(59), "59分鐘");
        assert_eq!(format_interval_label(119), "1小時");
        assert_eq!(format_interval_label(1439), "23小時");
        assert_eq!(format_interval_label(2879), "1天");
    }
}
