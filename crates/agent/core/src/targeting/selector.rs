//! Target selector: candidate query, exclusion filtering and ranking.
//!
//! Acts as the facade over [`RankingStrategy`] implementations, the way the
//! machine sees "pick something to work on".

use std::cmp::Reverse;

use crate::config::{DifficultyBand, SelectorConfig};
use crate::error::ConfigError;
use crate::state::{Entity, EntityTags, KindTag, NearbyFilter, Position, SelfStatus, TaskMemory};
use crate::targeting::{
    DifficultyStrategy, DifficultyTable, LowestHealthStrategy, NearestStrategy, RankingStrategy,
};

/// Eligible candidates for one decision, best first. Never persisted.
pub type CandidateSet = Vec<Entity>;

/// Filters and ranks candidate entities.
///
/// # Ordering
///
/// Candidates are ordered by the strategy score (descending), then distance
/// from the agent (ascending), then entity id, so equal inputs always yield the
/// same choice.
pub struct TargetSelector {
    strategy: Box<dyn RankingStrategy>,
    search_radius: u32,
    kinds: Vec<KindTag>,
    required_tags: EntityTags,
    exclude_names: Vec<String>,
    exclude_tags: EntityTags,
    band: Option<(DifficultyTable, f32, f32)>,
    passive: bool,
}

impl TargetSelector {
    /// Preset names accepted by [`TargetSelector::with_strategy_name`].
    pub const STRATEGY_NAMES: [&'static str; 3] = ["nearest", "difficulty", "lowest-health"];

    /// Create a selector that accepts anything within `search_radius`.
    pub fn new(strategy: Box<dyn RankingStrategy>, search_radius: u32) -> Self {
        Self {
            strategy,
            search_radius,
            kinds: Vec::new(),
            required_tags: EntityTags::empty(),
            exclude_names: Vec::new(),
            exclude_tags: EntityTags::empty(),
            band: None,
            passive: false,
        }
    }

    /// Create with a named preset.
    ///
    /// # Supported Names
    ///
    /// - `"nearest"` - closest first
    /// - `"difficulty"` - hardest first, using `band`'s table when given
    /// - `"lowest-health"` - weakest first
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStrategy`] for any other name.
    pub fn with_strategy_name(
        name: &str,
        band: Option<&DifficultyBand>,
        search_radius: u32,
    ) -> Result<Self, ConfigError> {
        let strategy: Box<dyn RankingStrategy> = match name {
            "nearest" => Box::new(NearestStrategy),
            "difficulty" => Box::new(DifficultyStrategy::new(
                band.map(|b| DifficultyTable::new(b.table.clone()))
                    .unwrap_or_default(),
            )),
            "lowest-health" => Box::new(LowestHealthStrategy),
            _ => return Err(ConfigError::UnknownStrategy(name.to_string())),
        };
        Ok(Self::new(strategy, search_radius))
    }

    pub fn is_known_strategy(name: &str) -> bool {
        Self::STRATEGY_NAMES.contains(&name)
    }

    pub fn from_config(config: &SelectorConfig) -> Result<Self, ConfigError> {
        let mut selector = Self::with_strategy_name(
            &config.strategy,
            config.difficulty.as_ref(),
            config.search_radius,
        )?;
        selector.kinds = config.kinds.clone();
        selector.required_tags = config.required_tags;
        selector.exclude_names = config
            .exclude_names
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        selector.exclude_tags = config.exclude_tags;
        selector.passive = config.passive;
        selector.band = config
            .difficulty
            .as_ref()
            .map(|b| (DifficultyTable::new(b.table.clone()), b.min, b.offset));
        Ok(selector)
    }

    pub fn current_strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn current_strategy_description(&self) -> &'static str {
        self.strategy.description()
    }

    /// Kinds worth attempting at the given proficiency.
    ///
    /// With a difficulty band this is every table kind in
    /// `[min, proficiency + offset]`; otherwise the configured kind list.
    pub fn eligible_kinds(&self, proficiency: f32) -> Vec<KindTag> {
        match &self.band {
            Some((table, min, offset)) => table.kinds_in_band(*min, proficiency + offset),
            None => self.kinds.clone(),
        }
    }

    /// Upper and lower band limits at `proficiency`, if a band is configured.
    pub fn band_limits(&self, proficiency: f32) -> Option<(f32, f32)> {
        self.band
            .as_ref()
            .map(|(_, min, offset)| (*min, proficiency + offset))
    }

    /// Builds the nearby-entity query for the current status.
    ///
    /// Returns `None` for a passive selector, or when a difficulty band is
    /// configured but no known kind falls inside it.
    pub fn query(&self, status: &SelfStatus) -> Option<NearbyFilter> {
        if self.passive {
            return None;
        }
        let kinds = self.eligible_kinds(status.resources.proficiency);
        if self.band.is_some() && kinds.is_empty() {
            return None;
        }
        Some(
            NearbyFilter::within(self.search_radius)
                .with_kinds(kinds)
                .with_tags(self.required_tags),
        )
    }

    fn is_excluded(&self, entity: &Entity, memory: &TaskMemory) -> bool {
        if memory.contains(entity.id) || entity.tags.intersects(self.exclude_tags) {
            return true;
        }
        if self.exclude_names.is_empty() {
            return false;
        }
        let name = entity.name.to_lowercase();
        self.exclude_names.iter().any(|ex| name.contains(ex.as_str()))
    }

    /// Drops remembered and excluded entities and orders the rest, best first.
    pub fn rank(
        &self,
        candidates: Vec<Entity>,
        memory: &TaskMemory,
        origin: Position,
    ) -> CandidateSet {
        let mut eligible: CandidateSet = candidates
            .into_iter()
            .filter(|entity| !self.is_excluded(entity, memory))
            .collect();

        eligible.sort_by_cached_key(|entity| {
            (
                Reverse(self.strategy.score(entity, origin)),
                origin.distance_to(entity.position),
                entity.id,
            )
        });
        eligible
    }

    /// Best eligible candidate, or `None` when nothing qualifies.
    pub fn select(
        &self,
        candidates: Vec<Entity>,
        memory: &TaskMemory,
        origin: Position,
    ) -> Option<Entity> {
        self.rank(candidates, memory, origin).into_iter().next()
    }
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new(Box::new(NearestStrategy), 10)
    }
}
