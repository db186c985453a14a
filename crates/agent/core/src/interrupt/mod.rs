//! Interrupt evaluation: guard conditions that preempt the main task.
//!
//! # Architecture
//!
//! - [`InterruptController::observe`] takes one snapshot of everything the guards
//!   look at (the only part that touches the host)
//! - [`InterruptController::evaluate`] runs the guards over that snapshot in
//!   priority order; the first guard that fires wins and the rest wait for the
//!   next Idle entry
//! - Guards are pure functions of the [`Observation`], so evaluating them has no
//!   side effects
//!
//! Priority order: flee > health drop > heal > tool > plan > inventory.

mod combat;
mod guards;

pub use combat::{CombatExit, CombatResponse, CombatSummary};
pub use guards::{FleeGuard, HealGuard, HealthDropGuard, InventoryGuard, PlanGuard, ToolGuard};

use crate::config::{AgentConfig, HealMethod};
use crate::env::{Host, find_any};
use crate::state::{ContainerScope, KindTag, SelfStatus};

/// Why the agent entered Recovering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryTrigger {
    UnderAttack { lost: u32 },
    NeedsHealing { percent: u32 },
}

/// Why the agent entered Depositing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InventoryTrigger {
    Overweight { weight: u32, maximum: u32 },
    StockCeiling { kind: KindTag, count: u32, ceiling: u32 },
    StockFloor { kind: KindTag, count: u32, floor: u32 },
}

/// A guard condition that fired.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interrupt {
    Flee { percent: u32 },
    Recover(RecoveryTrigger),
    ToolMissing,
    PlanComplete { proficiency: f32 },
    Inventory(InventoryTrigger),
}

/// Everything the guards need, captured once per tick.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Observation {
    pub status: SelfStatus,
    /// Health seen on the previous observed tick.
    pub previous_health: Option<u32>,
    /// `None` when the profile has no tool.
    pub tool_equipped: Option<bool>,
    /// Backpack counts of the tracked kinds.
    pub stock: Vec<(KindTag, u32)>,
    /// Backpack count of the restocked material and its floor.
    pub material: Option<(KindTag, u32, u32)>,
    /// Whether the configured heal method has what it needs.
    pub can_heal: bool,
}

/// Side-effect-free condition evaluated before the main task advances.
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower values are evaluated first.
    fn priority(&self) -> i32;

    fn check(&self, observation: &Observation) -> Option<Interrupt>;
}

/// Owns the guard list and the health baseline between ticks.
pub struct InterruptController {
    guards: Vec<Box<dyn Guard>>,
    tool_kinds: Vec<KindTag>,
    tracked: Vec<KindTag>,
    material: Option<(KindTag, u32)>,
    heal: HealMethod,
    previous_health: Option<u32>,
}

impl InterruptController {
    /// Creates a controller with the given guards, sorted by priority.
    pub fn new(mut guards: Vec<Box<dyn Guard>>) -> Self {
        guards.sort_by_key(|g| g.priority());
        Self {
            guards,
            tool_kinds: Vec::new(),
            tracked: Vec::new(),
            material: None,
            heal: HealMethod::None,
            previous_health: None,
        }
    }

    /// Builds the guard set a profile asks for.
    pub fn from_config(config: &AgentConfig) -> Self {
        let combat = &config.combat;
        let mut guards: Vec<Box<dyn Guard>> = Vec::new();

        if let Some(below) = combat.flee_below_percent {
            guards.push(Box::new(FleeGuard { below }));
        }
        if combat.self_defense {
            guards.push(Box::new(HealthDropGuard));
        }
        if let Some(below) = combat.heal_below_percent
            && combat.heal != HealMethod::None
        {
            guards.push(Box::new(HealGuard { below }));
        }
        if config.tool.is_some() {
            guards.push(Box::new(ToolGuard));
        }
        if let Some(plan) = &config.plan {
            guards.push(Box::new(PlanGuard { cap: plan.cap }));
        }
        guards.push(Box::new(InventoryGuard {
            weight_margin: config.inventory.weight_margin,
            ceilings: config
                .inventory
                .tracked
                .iter()
                .map(|t| (t.kind, t.ceiling))
                .collect(),
        }));

        let mut controller = Self::new(guards);
        controller.tool_kinds = config
            .tool
            .as_ref()
            .map(|t| t.kinds.clone())
            .unwrap_or_default();
        controller.tracked = config.inventory.tracked.iter().map(|t| t.kind).collect();
        controller.material = config.inventory.restock.as_ref().map(|r| (r.kind, r.floor));
        controller.heal = combat.heal.clone();
        controller
    }

    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    /// Overrides the restock floor, e.g. when a training tier changes.
    pub fn set_material_floor(&mut self, material: Option<(KindTag, u32)>) {
        self.material = material;
    }

    /// Forgets earlier health so damage taken before now is not re-reported.
    pub fn rebaseline(&mut self, health: u32) {
        self.previous_health = Some(health);
    }

    /// Reads the host and advances the health baseline.
    pub async fn observe<H: Host + ?Sized>(&mut self, host: &H) -> Observation {
        let status = host.snapshot_self().await;

        let tool_equipped = if self.tool_kinds.is_empty() {
            None
        } else {
            Some(find_any(host, &self.tool_kinds, ContainerScope::Equipped).await.is_some())
        };

        let mut stock = Vec::with_capacity(self.tracked.len());
        for kind in &self.tracked {
            stock.push((*kind, host.inventory_count(*kind, ContainerScope::Backpack).await));
        }

        let material = match self.material {
            Some((kind, floor)) => Some((
                kind,
                host.inventory_count(kind, ContainerScope::Backpack).await,
                floor,
            )),
            None => None,
        };

        let can_heal = match &self.heal {
            HealMethod::None => false,
            HealMethod::Bandage { kind, .. } => {
                host.inventory_count(*kind, ContainerScope::Backpack).await > 0
            }
            HealMethod::Spell { small_cost, .. } => status.resources.mana.current >= *small_cost,
        };

        let observation = Observation {
            status,
            previous_health: self.previous_health,
            tool_equipped,
            stock,
            material,
            can_heal,
        };
        self.previous_health = Some(status.health.current);
        observation
    }

    /// Highest-priority interrupt for this observation, if any.
    pub fn evaluate(&self, observation: &Observation) -> Option<Interrupt> {
        self.guards.iter().find_map(|g| g.check(observation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ToolConfig, TrackedStock};
    use crate::state::ResourceMeter;

    fn controller() -> InterruptController {
        let mut config = AgentConfig::default();
        config.combat.self_defense = true;
        config.tool = Some(ToolConfig {
            name: "hatchet".into(),
            kinds: vec![KindTag(0x0F43)],
        });
        config.inventory.tracked = vec![TrackedStock {
            kind: KindTag(0x1BDD),
            ceiling: 100,
        }];
        InterruptController::from_config(&config)
    }

    fn observation(health: u32, previous: u32, weight: u32) -> Observation {
        Observation {
            status: SelfStatus {
                health: ResourceMeter::new(health, 100),
                weight: ResourceMeter::new(weight, 400),
                ..SelfStatus::default()
            },
            previous_health: Some(previous),
            tool_equipped: Some(true),
            stock: vec![(KindTag(0x1BDD), 0)],
            ..Observation::default()
        }
    }

    #[test]
    fn guards_are_sorted_by_priority() {
        assert_eq!(
            controller().guard_names(),
            vec!["health_drop", "tool", "inventory"]
        );
    }

    #[test]
    fn health_preempts_inventory() {
        let controller = controller();
        let both = observation(80, 100, 390);
        assert_eq!(
            controller.evaluate(&both),
            Some(Interrupt::Recover(RecoveryTrigger::UnderAttack { lost: 20 }))
        );

        let only_inventory = observation(80, 80, 390);
        assert_eq!(
            controller.evaluate(&only_inventory),
            Some(Interrupt::Inventory(InventoryTrigger::Overweight {
                weight: 390,
                maximum: 400
            }))
        );
    }

    #[test]
    fn tool_outranks_inventory() {
        let controller = controller();
        let mut obs = observation(100, 100, 390);
        obs.tool_equipped = Some(false);
        assert_eq!(controller.evaluate(&obs), Some(Interrupt::ToolMissing));
    }

    #[test]
    fn quiet_observation_fires_nothing() {
        assert_eq!(controller().evaluate(&observation(100, 100, 10)), None);
    }
}
