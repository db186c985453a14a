//! Agent profile: every tunable the state machine reads, injected at start.
//!
//! A profile is immutable for the run. Each former standalone macro becomes one
//! instance of [`AgentConfig`] rather than a copy of the loop.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hooks::HookConfig;
use crate::plan::TrainingPlan;
use crate::state::{EntityId, EntityTags, KindTag, Position};
use crate::targeting::TargetSelector;

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub selector: SelectorConfig,
    pub capability: CapabilityConfig,
    pub patterns: OutcomePatterns,
    pub timing: TimingConfig,
    pub thresholds: ThresholdConfig,
    pub success_policy: SuccessPolicy,
    pub tool: Option<ToolConfig>,
    pub combat: CombatConfig,
    pub inventory: InventoryConfig,
    pub hooks: Vec<HookConfig>,
    pub plan: Option<TrainingPlan>,
}

impl AgentConfig {
    /// Checks every invariant that does not depend on the live world.
    ///
    /// Proficiency-dependent checks (training tier, difficulty band) run when the
    /// state machine starts and has a first status snapshot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !TargetSelector::is_known_strategy(&self.selector.strategy) {
            return Err(ConfigError::UnknownStrategy(self.selector.strategy.clone()));
        }

        self.timing.validate(self.capability.prompted)?;

        if !self.selector.passive && self.patterns.success.is_empty() {
            return Err(ConfigError::NoSuccessPatterns);
        }

        let has_tool_kinds = self.tool.as_ref().is_some_and(|t| !t.kinds.is_empty());
        if self.capability.via == CapabilityVia::EquippedTool && !has_tool_kinds {
            return Err(ConfigError::MissingToolKinds(self.capability.name.clone()));
        }

        self.combat.validate()?;

        self.inventory.validate()?;

        if let Some(plan) = &self.plan {
            plan.validate()?;
        }

        Ok(())
    }
}

// ============================================================================
// Target selection
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Ranking preset: `"nearest"`, `"difficulty"` or `"lowest-health"`.
    pub strategy: String,
    pub search_radius: u32,
    /// Accepted kinds; empty accepts any kind.
    pub kinds: Vec<KindTag>,
    pub required_tags: EntityTags,
    /// Case-insensitive substrings; matching names are never selected.
    pub exclude_names: Vec<String>,
    /// Entities carrying any of these tags are never selected.
    pub exclude_tags: EntityTags,
    pub difficulty: Option<DifficultyBand>,
    /// No main task: the agent only reacts to its guards (healing, backpack
    /// processing) and never selects a target.
    pub passive: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            strategy: "nearest".into(),
            search_radius: 10,
            kinds: Vec::new(),
            required_tags: EntityTags::empty(),
            exclude_names: Vec::new(),
            exclude_tags: EntityTags::IGNORABLE,
            difficulty: None,
            passive: false,
        }
    }
}

/// Kind→difficulty table plus the window of difficulties worth attempting,
/// `[min, proficiency + offset]`.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyBand {
    pub table: BTreeMap<KindTag, f32>,
    pub min: f32,
    pub offset: f32,
}

// ============================================================================
// Capability and outcome recognition
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Skill, spell or recipe name passed to the host.
    pub name: String,
    pub via: CapabilityVia,
    /// Whether the host asks for a target after the capability is used.
    pub prompted: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            name: "use".into(),
            via: CapabilityVia::Skill,
            prompted: true,
        }
    }
}

/// What the agent actually "uses" to interact with a target.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CapabilityVia {
    /// A named skill invoked directly.
    #[default]
    Skill,
    /// Whatever configured tool is in hand (axe, pickaxe, saw).
    EquippedTool,
    /// The target is itself the usable object (plants, ore piles).
    TargetItem,
    /// One unit of a backpack consumable per interaction.
    Consumable(KindTag),
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomePatterns {
    pub success: Vec<String>,
    /// Failures worth retrying on the same target.
    pub failure: Vec<String>,
    /// Failures that mean the target is done for this session.
    pub terminal: Vec<String>,
}

impl OutcomePatterns {
    /// Every failure phrase, retryable first.
    pub fn all_failures(&self) -> Vec<String> {
        self.failure.iter().chain(&self.terminal).cloned().collect()
    }

    pub fn is_terminal(&self, phrase: &str) -> bool {
        self.terminal.iter().any(|p| p == phrase)
    }
}

// ============================================================================
// Timing and thresholds
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub prompt_timeout_ms: u64,
    pub outcome_window_ms: u64,
    pub poll_interval_ms: u64,
    pub travel_timeout_secs: u64,
    /// Pause after an empty selection.
    pub idle_wait_ms: u64,
    /// Pause after each classified attempt.
    pub action_cooldown_ms: u64,
}

impl TimingConfig {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_millis(self.prompt_timeout_ms)
    }

    pub fn outcome_window(&self) -> Duration {
        Duration::from_millis(self.outcome_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn travel_timeout(&self) -> Duration {
        Duration::from_secs(self.travel_timeout_secs)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn action_cooldown(&self) -> Duration {
        Duration::from_millis(self.action_cooldown_ms)
    }

    fn validate(&self, prompted: bool) -> Result<(), ConfigError> {
        let required = [
            ("outcome_window_ms", self.outcome_window_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("travel_timeout_secs", self.travel_timeout_secs),
        ];
        for (field, value) in required {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        if prompted && self.prompt_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "prompt_timeout_ms",
            });
        }
        if self.poll_interval_ms > self.outcome_window_ms {
            return Err(ConfigError::PollExceedsWindow {
                poll_ms: self.poll_interval_ms,
                window_ms: self.outcome_window_ms,
            });
        }
        Ok(())
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            prompt_timeout_ms: 2_000,
            outcome_window_ms: 15_000,
            poll_interval_ms: 500,
            travel_timeout_secs: 20,
            idle_wait_ms: 1_000,
            action_cooldown_ms: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Retryable failures allowed per target; `0` retries forever.
    pub maximum_attempts: u32,
    pub memory_capacity: usize,
    /// Consecutive empty selections before giving up; `None` waits forever.
    pub idle_limit: Option<u32>,
    /// Range at which the agent can interact without travelling.
    pub approach_range: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            maximum_attempts: 3,
            memory_capacity: crate::state::TaskMemory::DEFAULT_CAPACITY,
            idle_limit: None,
            approach_range: 1,
        }
    }
}

/// What happens to a target after a successful interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuccessPolicy {
    /// Remember the target so it is never picked again.
    #[default]
    Exhaust,
    /// Keep working the same target until a terminal phrase appears.
    Repeat,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub name: String,
    /// Interchangeable kinds, preferred first.
    pub kinds: Vec<KindTag>,
}

// ============================================================================
// Combat and recovery
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Respond to any health loss with the combat sub-loop.
    pub self_defense: bool,
    pub heal: HealMethod,
    /// Heal even when nothing is attacking.
    pub heal_below_percent: Option<u32>,
    /// Abandon the run and retreat below this health.
    pub flee_below_percent: Option<u32>,
    pub safe_spot: Option<Position>,
    pub hostile_range: u32,
    pub max_rounds: u32,
    pub round_interval_ms: u64,
    /// Weapon to hold while fighting; the tool is re-equipped afterwards.
    pub weapon: Option<KindTag>,
    pub offense: Offense,
    /// Health percentage at which recovery counts as done.
    pub restore_percent: u32,
}

impl CombatConfig {
    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let percents = [
            ("heal_below", self.heal_below_percent),
            ("flee_below", self.flee_below_percent),
            ("restore", Some(self.restore_percent)),
        ];
        for (name, value) in percents {
            if let Some(value) = value
                && !(1..=100).contains(&value)
            {
                return Err(ConfigError::InvalidPercent(name));
            }
        }
        if self.flee_below_percent.is_some() && self.safe_spot.is_none() {
            return Err(ConfigError::MissingSafeSpot);
        }
        Ok(())
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            self_defense: false,
            heal: HealMethod::None,
            heal_below_percent: None,
            flee_below_percent: None,
            safe_spot: None,
            hostile_range: 8,
            max_rounds: 30,
            round_interval_ms: 1_000,
            weapon: None,
            offense: Offense::Attack,
            restore_percent: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HealMethod {
    #[default]
    None,
    Bandage {
        kind: KindTag,
        #[serde(default = "default_bandage_cooldown")]
        cooldown_ms: u64,
    },
    Spell {
        #[serde(default = "default_small_heal")]
        small: String,
        #[serde(default = "default_large_heal")]
        large: String,
        #[serde(default = "default_small_cost")]
        small_cost: u32,
        #[serde(default = "default_large_cost")]
        large_cost: u32,
        /// Health deficit above which the large spell is preferred.
        #[serde(default = "default_large_deficit")]
        large_deficit: u32,
    },
}

fn default_bandage_cooldown() -> u64 {
    5_000
}
fn default_small_heal() -> String {
    "Heal".into()
}
fn default_large_heal() -> String {
    "Greater Heal".into()
}
fn default_small_cost() -> u32 {
    4
}
fn default_large_cost() -> u32 {
    11
}
fn default_large_deficit() -> u32 {
    30
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Offense {
    /// Plain melee attack on the hostile.
    #[default]
    Attack,
    /// A prompted skill aimed at the hostile (e.g. peacemaking).
    Skill(String),
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Stones of headroom below maximum weight that count as overweight.
    pub weight_margin: u32,
    pub tracked: Vec<TrackedStock>,
    pub conversion: Option<ConversionConfig>,
    pub deposit: Option<DepositConfig>,
    pub restock: Option<RestockConfig>,
    pub overflow: OverflowPolicy,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            weight_margin: 25,
            tracked: Vec::new(),
            conversion: None,
            deposit: None,
            restock: None,
            overflow: OverflowPolicy::Deposit,
        }
    }
}

impl InventoryConfig {
    /// Every tracked kind needs a sub-task that takes it out of the backpack.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(deposit) = &self.deposit
            && deposit.kinds.is_empty()
        {
            return Err(ConfigError::EmptyDeposit);
        }

        let unloaded: &[KindTag] = match (&self.overflow, &self.deposit) {
            (OverflowPolicy::Deposit, Some(deposit)) => &deposit.kinds,
            (OverflowPolicy::Dispose { kinds, .. }, _) => kinds,
            // Nowhere to unload: a tripped ceiling ends the run instead.
            _ => return Ok(()),
        };
        let converted = self.conversion.as_ref().map(|c| c.raw);
        match self
            .tracked
            .iter()
            .find(|t| !unloaded.contains(&t.kind) && Some(t.kind) != converted)
        {
            Some(stuck) => Err(ConfigError::UnloadedStock(stuck.kind)),
            None => Ok(()),
        }
    }
}

/// A backpack kind with a count ceiling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedStock {
    pub kind: KindTag,
    pub ceiling: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub raw: KindTag,
    pub refined: KindTag,
    pub via: ConversionVia,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
}

fn default_batch_limit() -> u32 {
    50
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionVia {
    /// Use the equipped tool and target the raw stack (axe on logs).
    ToolOnRaw,
    /// Use the raw stack and target a station (ore on a forge).
    RawOnStation(EntityId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositConfig {
    pub site: Position,
    pub container: EntityId,
    pub kinds: Vec<KindTag>,
    /// Unload once more before terminating for lack of tools or targets.
    #[serde(default)]
    pub finish_with_deposit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockConfig {
    pub kind: KindTag,
    pub supply: EntityId,
    #[serde(default)]
    pub site: Option<Position>,
    pub floor: u32,
    #[serde(default = "default_weight_buffer")]
    pub weight_buffer: u32,
}

fn default_weight_buffer() -> u32 {
    50
}

/// What to do with a full pack when there is nowhere to unload.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Unload at the drop-off; without one, stop.
    #[default]
    Deposit,
    Dispose {
        kinds: Vec<KindTag>,
        destination: DisposeTo,
    },
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisposeTo {
    #[default]
    Ground,
    Container(EntityId),
}
