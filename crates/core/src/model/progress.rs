use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::level::{Level, Stage};
use crate::scheduler::{self, StageTransition};
use crate::time;

//
// ─── LEVEL PROGRESS ────────────────────────────────────────────────────────────
//

/// Review progress for one difficulty level.
///
/// Timestamps are milliseconds since the Unix epoch; `last_played == 0`
/// means the level has never been completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    level: Level,
    last_played: i64,
    stage: Stage,
    history: Vec<i64>,
}

impl LevelProgress {
    /// A level that has never been played.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self {
            level,
            last_played: 0,
            stage: Stage::NEW,
            history: Vec::new(),
        }
    }

    /// Rehydrate a record from persisted values. The stage is clamped.
    #[must_use]
    pub fn from_persisted(level: Level, last_played: i64, stage: i64, history: Vec<i64>) -> Self {
        Self {
            level,
            last_played,
            stage: Stage::new(stage),
            history,
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Raw `lastPlayed` value in epoch milliseconds (`0` = never).
    #[must_use]
    pub fn last_played_millis(&self) -> i64 {
        self.last_played
    }

    #[must_use]
    pub fn last_played_at(&self) -> Option<DateTime<Utc>> {
        time::from_millis(self.last_played)
    }

    #[must_use]
    pub fn history(&self) -> &[i64] {
        &self.history
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.last_played == 0 && self.stage.is_new()
    }

    /// Apply a completed session at `completed_at`.
    ///
    /// The stage follows [`scheduler::transition`]; `last_played` and the
    /// history are updated regardless of whether the stage moved.
    pub fn record_session(&mut self, completed_at: DateTime<Utc>) -> StageTransition {
        let transition = scheduler::transition(self, completed_at);
        let now = completed_at.timestamp_millis();

        self.stage = transition.to;
        self.last_played = now;
        self.history.push(now);

        transition
    }
}

//
// ─── ALL PROGRESS ──────────────────────────────────────────────────────────────
//

/// Progress for every level. Exactly one record per level is always present.
///
/// Serialized as `{"A": {...}, "B": {...}, "C": {...}}`. A level missing from
/// a persisted blob is filled with a fresh record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllProgress {
    #[serde(rename = "A", default = "new_a")]
    a: LevelProgress,
    #[serde(rename = "B", default = "new_b")]
    b: LevelProgress,
    #[serde(rename = "C", default = "new_c")]
    c: LevelProgress,
}

fn new_a() -> LevelProgress {
    LevelProgress::new(Level::A)
}

fn new_b() -> LevelProgress {
    LevelProgress::new(Level::B)
}

fn new_c() -> LevelProgress {
    LevelProgress::new(Level::C)
}

impl Default for AllProgress {
    fn default() -> Self {
        Self {
            a: new_a(),
            b: new_b(),
            c: new_c(),
        }
    }
}

impl AllProgress {
    #[must_use]
    pub fn get(&self, level: Level) -> &LevelProgress {
        match level {
            Level::A => &self.a,
            Level::B => &self.b,
            Level::C => &self.c,
        }
    }

    pub fn get_mut(&mut self, level: Level) -> &mut LevelProgress {
        match level {
            Level::A => &mut self.a,
            Level::B => &mut self.b,
            Level::C => &mut self.c,
        }
    }

    /// Iterate records in `A, B, C` order.
    pub fn iter(&self) -> impl Iterator<Item = &LevelProgress> {
        Level::ALL.into_iter().map(move |level| self.get(level))
    }

    pub fn record_session(&mut self, level: Level, completed_at: DateTime<Utc>) -> StageTransition {
        self.get_mut(level).record_session(completed_at)
    }

    /// Force each record's `level` to match the key it is stored under.
    ///
    /// Returns `true` if anything had to be corrected.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        for level in Level::ALL {
            let record = self.get_mut(level);
            if record.level != level {
                record.level = level;
                changed = true;
            }
        }
        changed
    }
}
