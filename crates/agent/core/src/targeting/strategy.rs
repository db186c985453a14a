//! Ranking key used by the selector.

use crate::state::{Entity, Position};

/// Primary ranking key for candidate targets.
///
/// Higher scores rank first. The selector breaks ties by distance and then by
/// entity id, so implementations only express the primary preference.
/// Implementations must be deterministic.
pub trait RankingStrategy: Send + Sync {
    fn score(&self, entity: &Entity, origin: Position) -> i64;

    /// Returns the strategy name for debugging and logging.
    fn name(&self) -> &'static str;

    /// Returns an optional description of the strategy's behavior.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
