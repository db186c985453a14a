//! Weakest-first ranking.

use crate::state::{Entity, Position};
use crate::targeting::RankingStrategy;

/// Targets the candidate with the lowest health percentage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestHealthStrategy;

impl RankingStrategy for LowestHealthStrategy {
    fn score(&self, entity: &Entity, _origin: Position) -> i64 {
        -i64::from(entity.health.percent())
    }

    fn name(&self) -> &'static str {
        "LowestHealth"
    }

    fn description(&self) -> &'static str {
        "Targets the candidate with the lowest health percentage"
    }
}
