//! Scenario description and RON loader.

use std::collections::BTreeMap;
use std::path::Path;

use agent_core::{ContainerScope, EntityId, EntityTags, KindTag, Position};
use serde::{Deserialize, Serialize};

/// Full description of a simulated world at time zero.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub agent: AgentSpec,
    pub entities: Vec<EntitySpec>,
    pub items: Vec<ItemSpec>,
    /// Stones per unit; kinds not listed weigh one stone.
    pub weights: BTreeMap<KindTag, u32>,
    pub conversions: Vec<ConversionRule>,
    pub settings: SimSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSpec {
    pub health: (u32, u32),
    pub mana: (u32, u32),
    pub followers: (u32, u32),
    pub max_weight: u32,
    pub proficiency: f32,
    pub proficiency_cap: f32,
    /// Proficiency gained per successful use.
    pub gain: f32,
    pub position: Position,
}

impl Default for AgentSpec {
    fn default() -> Self {
        Self {
            health: (100, 100),
            mana: (50, 50),
            followers: (0, 5),
            max_weight: 400,
            proficiency: 50.0,
            proficiency_cap: 100.0,
            gain: 0.0,
            position: Position::ORIGIN,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub id: EntityId,
    pub kind: KindTag,
    #[serde(default)]
    pub name: String,
    pub position: Position,
    #[serde(default = "full_health")]
    pub health: (u32, u32),
    #[serde(default)]
    pub tags: EntityTags,
    #[serde(default)]
    pub behavior: Behavior,
}

fn full_health() -> (u32, u32) {
    (100, 100)
}

/// How an entity reacts when the agent interacts with it.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum Behavior {
    /// Produces no feedback at all.
    #[default]
    Inert,
    /// Resource node yielding `per_use` of `yield_kind` until `remaining` runs out.
    Harvest {
        yield_kind: KindTag,
        #[serde(default = "one")]
        per_use: u32,
        remaining: u32,
        success_text: String,
        depleted_text: String,
        /// Every n-th use fails with `fail_text` without consuming the node.
        #[serde(default)]
        fail_every: Option<u32>,
        #[serde(default)]
        fail_text: String,
    },
    /// Creature that resists `resist` attempts before accepting the agent.
    Tame {
        resist: u32,
        success_text: String,
        failure_text: String,
        tamed_text: String,
    },
    /// Crafting station that turns `cost` units of `material` into one `product`.
    Station {
        material: KindTag,
        cost: u32,
        product: KindTag,
        success_text: String,
        shortage_text: String,
    },
    /// Container that can be opened (corpses, crates).
    Container {
        #[serde(default)]
        open_text: String,
    },
}

fn one() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub id: EntityId,
    pub kind: KindTag,
    #[serde(default = "one")]
    pub amount: u32,
    pub container: ContainerScope,
    /// Uses left before the item breaks; `None` never breaks.
    #[serde(default)]
    pub uses: Option<u32>,
}

/// Raw→refined processing, by tool (`station: None`) or at a station.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversionRule {
    pub raw: KindTag,
    pub refined: KindTag,
    /// Refined units produced per raw unit.
    #[serde(default = "one")]
    pub ratio: u32,
    #[serde(default)]
    pub station: Option<EntityId>,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellRule {
    pub mana: u32,
    pub heal: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Delay before a feed line becomes visible.
    pub feed_latency_ms: u64,
    /// Delay before a target prompt appears.
    pub prompt_delay_ms: u64,
    /// When false, prompts never appear.
    pub responsive: bool,
    pub travel_ms_per_tile: u64,
    /// Destinations travel can never reach.
    pub unreachable: Vec<Position>,
    /// Range within which containers can be used.
    pub reach: u32,
    pub strike_damage: u32,
    pub bandage_kind: KindTag,
    pub bandage_heal: u32,
    pub spells: BTreeMap<String, SpellRule>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            feed_latency_ms: 300,
            prompt_delay_ms: 100,
            responsive: true,
            travel_ms_per_tile: 250,
            unreachable: Vec::new(),
            reach: 2,
            strike_damage: 25,
            bandage_kind: KindTag(0x0E21),
            bandage_heal: 15,
            spells: BTreeMap::from([
                ("Heal".to_string(), SpellRule { mana: 4, heal: 10 }),
                ("Greater Heal".to_string(), SpellRule { mana: 11, heal: 30 }),
            ]),
        }
    }
}

/// Loads scenarios from RON.
pub struct ScenarioLoader;

impl ScenarioLoader {
    pub fn load(path: &Path) -> anyhow::Result<Scenario> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read scenario {}: {}", path.display(), e))?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> anyhow::Result<Scenario> {
        ron::from_str(content).map_err(|e| anyhow::anyhow!("Invalid scenario RON: {}", e))
    }
}
