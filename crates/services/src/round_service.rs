use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

use speedread_core::model::round::COMPLETION_REWARD_COINS;
use speedread_core::scheduler;
use speedread_core::{Clock, Level, SpeedRound, Stage, WordSets};

use crate::error::RoundServiceError;
use crate::progress_service::ProgressService;

/// What the player sees after finishing a round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    pub level: Level,
    pub elapsed: Duration,
    pub coins: u32,
    /// Coins earned across every round finished through this service.
    pub total_coins: u32,
    pub stage: Stage,
    /// Label of the interval until the next review, e.g. `1小時`.
    pub reminder_label: String,
}

impl RoundOutcome {
    /// Elapsed time in seconds with one decimal, as shown on the timer.
    #[must_use]
    pub fn elapsed_display(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let seconds = self.elapsed.num_milliseconds() as f64 / 1000.0;
        format!("{seconds:.1}")
    }
}

/// Creates rounds and records finished ones against level progress.
///
/// Clones share one coin balance, which lives only as long as the service.
#[derive(Clone)]
pub struct RoundService {
    clock: Clock,
    progress: ProgressService,
    coins: Arc<AtomicU32>,
}

impl RoundService {
    #[must_use]
    pub fn new(clock: Clock, progress: ProgressService) -> Self {
        Self {
            clock,
            progress,
            coins: Arc::new(AtomicU32::new(0)),
        }
    }


    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Shuffle a fresh grid for `level` using thread-local randomness.
    #[must_use]
    pub fn start_round(&self, level: Level, words: &WordSets) -> SpeedRound {
        self.start_round_with_rng(level, words, &mut rand::rng())
    }

    pub fn start_round_with_rng<R: Rng + ?Sized>(
        &self,
        level: Level,
        words: &WordSets,
        rng: &mut R,
    ) -> SpeedRound {
        SpeedRound::new(level, words.words(level), rng)
    }

    /// Record a completed round as a session for its level.
    ///
    /// # Errors
    ///
    /// Returns `RoundServiceError::Incomplete` if tiles remain, or a progress
    /// error if the session cannot be stored.
    pub async fn finish(&self, round: &SpeedRound) -> Result<RoundOutcome, RoundServiceError> {
        if !round.is_complete() {
            return Err(RoundServiceError::Incomplete);
        }

        let now = self.now();
        let level = round.level();
        let progress = self.progress.record_session(level, now).await?;
        let stage = progress.get(level).stage();
        let elapsed = round.elapsed(now);

        let total_coins = self
            .coins
            .fetch_add(COMPLETION_REWARD_COINS, Ordering::Relaxed)
            .saturating_add(COMPLETION_REWARD_COINS);

        info!(%level, %stage, elapsed_ms = elapsed.num_milliseconds(), total_coins, "round finished");

        Ok(RoundOutcome {
            level,
            elapsed,
            coins: COMPLETION_REWARD_COINS,
            total_coins,
            stage,
            reminder_label: scheduler::next_review_interval_label(stage),
        })
    }
}
