//! Built-in guard conditions.

use super::{Guard, Interrupt, InventoryTrigger, Observation, RecoveryTrigger};
use crate::state::KindTag;

/// Retreat and stop when health is critically low.
#[derive(Debug, Clone, Copy)]
pub struct FleeGuard {
    pub below: u32,
}

impl Guard for FleeGuard {
    fn name(&self) -> &'static str {
        "flee"
    }

    fn priority(&self) -> i32 {
        -100
    }

    fn check(&self, observation: &Observation) -> Option<Interrupt> {
        let percent = observation.status.health.percent();
        (percent < self.below).then_some(Interrupt::Flee { percent })
    }
}

/// Any health lost since the previous tick.
#[derive(Debug, Clone, Copy)]
pub struct HealthDropGuard;

impl Guard for HealthDropGuard {
    fn name(&self) -> &'static str {
        "health_drop"
    }

    fn priority(&self) -> i32 {
        -50
    }

    fn check(&self, observation: &Observation) -> Option<Interrupt> {
        let previous = observation.previous_health?;
        let current = observation.status.health.current;
        (current < previous).then_some(Interrupt::Recover(RecoveryTrigger::UnderAttack {
            lost: previous - current,
        }))
    }
}

/// Health below the heal threshold while a heal is available.
#[derive(Debug, Clone, Copy)]
pub struct HealGuard {
    pub below: u32,
}

impl Guard for HealGuard {
    fn name(&self) -> &'static str {
        "heal"
    }

    fn priority(&self) -> i32 {
        -40
    }

    fn check(&self, observation: &Observation) -> Option<Interrupt> {
        let percent = observation.status.health.percent();
        (observation.can_heal && percent < self.below)
            .then_some(Interrupt::Recover(RecoveryTrigger::NeedsHealing { percent }))
    }
}

/// Configured tool no longer in hand.
#[derive(Debug, Clone, Copy)]
pub struct ToolGuard;

impl Guard for ToolGuard {
    fn name(&self) -> &'static str {
        "tool"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn check(&self, observation: &Observation) -> Option<Interrupt> {
        (observation.tool_equipped == Some(false)).then_some(Interrupt::ToolMissing)
    }
}

/// Training plan has reached its proficiency cap.
#[derive(Debug, Clone, Copy)]
pub struct PlanGuard {
    pub cap: f32,
}

impl Guard for PlanGuard {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn check(&self, observation: &Observation) -> Option<Interrupt> {
        let proficiency = observation.status.resources.proficiency;
        (proficiency >= self.cap).then_some(Interrupt::PlanComplete { proficiency })
    }
}

/// Weight near maximum, a tracked stack over its ceiling, or material under its floor.
#[derive(Debug, Clone)]
pub struct InventoryGuard {
    pub weight_margin: u32,
    pub ceilings: Vec<(KindTag, u32)>,
}

impl Guard for InventoryGuard {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn check(&self, observation: &Observation) -> Option<Interrupt> {
        let weight = observation.status.weight;
        if weight.maximum > 0 && weight.current + self.weight_margin >= weight.maximum {
            return Some(Interrupt::Inventory(InventoryTrigger::Overweight {
                weight: weight.current,
                maximum: weight.maximum,
            }));
        }

        for (kind, ceiling) in &self.ceilings {
            let count = observation
                .stock
                .iter()
                .find(|(k, _)| k == kind)
                .map_or(0, |(_, c)| *c);
            if count > *ceiling {
                return Some(Interrupt::Inventory(InventoryTrigger::StockCeiling {
                    kind: *kind,
                    count,
                    ceiling: *ceiling,
                }));
            }
        }

        match observation.material {
            Some((kind, count, floor)) if count < floor => {
                Some(Interrupt::Inventory(InventoryTrigger::StockFloor { kind, count, floor }))
            }
            _ => None,
        }
    }
}
