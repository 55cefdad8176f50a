mod level;
mod progress;
pub mod round;
mod word_sets;

pub use level::{Level, LevelParseError, Stage};
pub use progress::{AllProgress, LevelProgress};
pub use round::{DefuseOutcome, RoundError, SpeedRound, Tile};
pub use word_sets::{WordSets, WordSetsError};
