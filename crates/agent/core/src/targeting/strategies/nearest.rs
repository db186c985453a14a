//! Closest-first ranking.

use crate::state::{Entity, Position};
use crate::targeting::RankingStrategy;

/// Targets the closest candidate.
///
/// Used by gatherers, where every node of the configured kinds is equally good
/// and walking is the only cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestStrategy;

impl RankingStrategy for NearestStrategy {
    fn score(&self, entity: &Entity, origin: Position) -> i64 {
        -i64::from(origin.distance_to(entity.position))
    }

    fn name(&self) -> &'static str {
        "Nearest"
    }

    fn description(&self) -> &'static str {
        "Targets the closest candidate, ignoring all other factors"
    }
}
