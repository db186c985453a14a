//! Built-in ranking strategies.

pub mod difficulty;
pub mod lowest_health;
pub mod nearest;

pub use difficulty::{DifficultyStrategy, DifficultyTable};
pub use lowest_health::LowestHealthStrategy;
pub use nearest::NearestStrategy;
