#![forbid(unsafe_code)]

pub mod model;
pub mod retention;
pub mod scheduler;
pub mod time;

pub use model::{AllProgress, Level, LevelProgress, SpeedRound, Stage, WordSets};
pub use time::Clock;
