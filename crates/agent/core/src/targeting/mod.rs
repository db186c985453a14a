//! Target acquisition: filter the nearby snapshot, rank what is left, pick one.

mod selector;
pub mod strategies;
mod strategy;

pub use selector::{CandidateSet, TargetSelector};
pub use strategies::{DifficultyStrategy, DifficultyTable, LowestHealthStrategy, NearestStrategy};
pub use strategy::RankingStrategy;
