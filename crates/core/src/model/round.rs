use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::model::level::Level;

/// Tiles per round.
pub const GRID_SIZE: usize = 20;

/// Coins awarded for defusing every tile.
pub const COMPLETION_REWARD_COINS: u32 = 20;

/// Placeholder words used when a level has no words at all.
pub const FALLBACK_WORDS: [&str; 4] = ["無", "字詞", "請", "新增"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoundError {
    #[error("round has not been started")]
    NotStarted,
    #[error("round already completed")]
    Completed,
    #[error("tile {index} is out of range (grid has {len} tiles)")]
    TileOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub word: String,
    pub defused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefuseOutcome {
    /// Tile was already defused; nothing changed.
    AlreadyDefused,
    Defused { remaining: usize },
    /// Last tile defused. The timer is stopped.
    Completed { elapsed: Duration, coins: u32 },
}

/// One timed pass over a shuffled grid of word tiles.
///
/// Elapsed time only accumulates while the timer runs. Tiles can be defused
/// once the round has been started, even while paused.
#[derive(Debug, Clone)]
pub struct SpeedRound {
    level: Level,
    tiles: Vec<Tile>,
    started: bool,
    running_since: Option<DateTime<Utc>>,
    accumulated: Duration,
    completed: bool,
}

impl SpeedRound {
    /// Build a grid of `GRID_SIZE` tiles by cycling `words`, then shuffle it.
    pub fn new<R: Rng + ?Sized>(level: Level, words: &[String], rng: &mut R) -> Self {
        let source: Vec<&str> = if words.is_empty() {
            FALLBACK_WORDS.to_vec()
        } else {
            words.iter().map(String::as_str).collect()
        };

        let mut tiles: Vec<Tile> = source
            .iter()
            .cycle()
            .take(GRID_SIZE)
            .map(|word| Tile {
                word: (*word).to_owned(),
                defused: false,
            })
            .collect();
        tiles.shuffle(rng);

        Self {
            level,
            tiles,
            started: false,
            running_since: None,
            accumulated: Duration::zero(),
            completed: false,
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tiles.iter().filter(|tile| !tile.defused).count()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Start or resume the timer. No-op if already running.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::Completed` once every tile is defused.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), RoundError> {
        if self.completed {
            return Err(RoundError::Completed);
        }
        if self.running_since.is_none() {
            self.running_since = Some(now);
            self.started = true;
        }
        Ok(())
    }

    /// Stop the timer, keeping the time accumulated so far.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += (now - since).max(Duration::zero());
        }
    }

    /// Time spent with the timer running, up to `now`.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + (now - since).max(Duration::zero()),
            None => self.accumulated,
        }
    }

    /// Mark the tile at `index` as read.
    ///
    /// # Errors
    ///
    /// - `NotStarted` before the timer was ever started
    /// - `Completed` after the last tile was defused
    /// - `TileOutOfRange` for an invalid index
    pub fn defuse(&mut self, index: usize, now: DateTime<Utc>) -> Result<DefuseOutcome, RoundError> {
        if self.completed {
            return Err(RoundError::Completed);
        }
        if !self.started {
            return Err(RoundError::NotStarted);
        }
        let len = self.tiles.len();
        let tile = self
            .tiles
            .get_mut(index)
            .ok_or(RoundError::TileOutOfRange { index, len })?;

        if tile.defused {
            return Ok(DefuseOutcome::AlreadyDefused);
        }
        tile.defused = true;

        let remaining = self.remaining();
        if remaining > 0 {
            return Ok(DefuseOutcome::Defused { remaining });
        }

        self.pause(now);
        self.completed = true;
        Ok(DefuseOutcome::Completed {
            elapsed: self.accumulated,
            coins: COMPLETION_REWARD_COINS,
        })
    }
}
