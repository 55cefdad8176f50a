use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Difficulty level of a word set.
///
/// - `A`: common daily words (1-2 characters)
/// - `B`: intermediate words (2-3 characters)
/// - `C`: idioms and formal vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    A,
    B,
    C,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::A, Level::B, Level::C];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::A => "A",
            Level::B => "B",
            Level::C => "C",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown level: {0} (expected A, B or C)")]
pub struct LevelParseError(pub String);

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Level::A),
            "B" | "b" => Ok(Level::B),
            "C" | "c" => Ok(Level::C),
            other => Err(LevelParseError(other.to_owned())),
        }
    }
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// Position on the forgetting-curve schedule, always within `0..=6`.
///
/// Any integer converted into a `Stage` is clamped into range, which also
/// applies to values read back from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Stage(u8);

impl Stage {
    /// Never successfully reviewed.
    pub const NEW: Stage = Stage(0);
    /// Terminal stage; further sessions stay here.
    pub const MAX: Stage = Stage(6);

    #[must_use]
    pub fn new(value: i64) -> Self {
        let clamped = value.clamp(0, i64::from(Self::MAX.0));
        // Clamped into 0..=6 above, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(clamped as u8)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_new(self) -> bool {
        self.0 == 0
    }

    /// The following stage, saturating at `Stage::MAX`.
    #[must_use]
    pub fn next(self) -> Self {
        Self::new(i64::from(self.0) + 1)
    }
}

impl From<i64> for Stage {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("a".parse::<Level>().unwrap(), Level::A);
        assert_eq!(" C ".parse::<Level>().unwrap(), Level::C);
        let err = "D".parse::<Level>().unwrap_err();
        assert_eq!(err, LevelParseError("D".into()));
    }

    #[test]
    fn stage_clamps_out_of_range_values() {
        assert_eq!(Stage::new(-3), Stage::NEW);
        assert_eq!(Stage::new(42), Stage::MAX);
        assert_eq!(Stage::new(4).value(), 4);
    }

    #[test]
    fn stage_next_saturates() {
        assert_eq!(Stage::NEW.next().value(), 1);
        assert_eq!(Stage::MAX.next(), Stage::MAX);
    }

    #[test]
    fn stage_deserializes_with_clamping() {
        let stage: Stage = serde_json::from_str("9").unwrap();
        assert_eq!(stage, Stage::MAX);
        let stage: Stage = serde_json::from_str("-1").unwrap();
        assert_eq!(stage, Stage::NEW);
        assert_eq!(serde_json::to_string(&Stage::new(3)).unwrap(), "3");
    }
}
