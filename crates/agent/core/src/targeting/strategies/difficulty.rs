//! Hardest-first ranking against an injected difficulty table.

use std::collections::BTreeMap;

use crate::state::{Entity, KindTag, Position};
use crate::targeting::RankingStrategy;

/// Immutable kind→difficulty lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DifficultyTable {
    entries: BTreeMap<KindTag, f32>,
}

impl DifficultyTable {
    pub fn new(entries: BTreeMap<KindTag, f32>) -> Self {
        Self { entries }
    }

    pub fn get(&self, kind: KindTag) -> Option<f32> {
        self.entries.get(&kind).copied()
    }

    /// Kinds whose difficulty lies within `[min, max]`, in kind order.
    pub fn kinds_in_band(&self, min: f32, max: f32) -> Vec<KindTag> {
        self.entries
            .iter()
            .filter(|(_, difficulty)| **difficulty >= min && **difficulty <= max)
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Targets the hardest candidate the table knows about.
///
/// Training profiles want the most difficult target still inside the band so
/// every attempt has the best chance of a skill gain. Unknown kinds rank last.
#[derive(Debug, Clone, Default)]
pub struct DifficultyStrategy {
    table: DifficultyTable,
}

impl DifficultyStrategy {
    pub fn new(table: DifficultyTable) -> Self {
        Self { table }
    }
}

impl RankingStrategy for DifficultyStrategy {
    fn score(&self, entity: &Entity, _origin: Position) -> i64 {
        match self.table.get(entity.kind) {
            // Tenths of a point keep one decimal of skill resolution.
            Some(difficulty) => (difficulty * 10.0).round() as i64,
            None => -1,
        }
    }

    fn name(&self) -> &'static str {
        "Difficulty"
    }

    fn description(&self) -> &'static str {
        "Targets the most difficult candidate within the trainable band"
    }
}
