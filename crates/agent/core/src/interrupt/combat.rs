//! Bounded combat/recovery sub-loop run while the agent is Recovering.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::RecoveryTrigger;
use crate::config::{AgentConfig, CombatConfig, HealMethod, Offense};
use crate::env::{Actor, Host, TargetRef, find_any};
use crate::state::{ContainerScope, Entity, EntityTags, KindTag, NearbyFilter, Position, SelfStatus};

/// How a combat sub-loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatExit {
    /// No hostile left and health restored.
    Cleared,
    /// No hostile left but nothing more could be done for health.
    Unhealed,
    /// Round budget spent.
    RoundLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombatSummary {
    pub rounds: u32,
    pub heals: u32,
    pub strikes: u32,
    pub exit: CombatExit,
}

/// Fights back and patches up until the area is quiet.
///
/// Each round performs at most one action: a heal when health is under the
/// heal threshold and a remedy is available, otherwise an offensive action on
/// the chosen hostile.
pub struct CombatResponse {
    config: CombatConfig,
    tool_kinds: Vec<KindTag>,
    prompt_timeout: Duration,
    last_bandage: Option<Instant>,
}

impl CombatResponse {
    pub fn new(config: CombatConfig, tool_kinds: Vec<KindTag>, prompt_timeout: Duration) -> Self {
        Self {
            config,
            tool_kinds,
            prompt_timeout,
            last_bandage: None,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.combat.clone(),
            config.tool.as_ref().map(|t| t.kinds.clone()).unwrap_or_default(),
            config.timing.prompt_timeout(),
        )
    }

    /// Hostile to engage: whoever is attacking us, else the nearest, else lowest id.
    async fn pick_hostile<H: Host + ?Sized>(&self, host: &H, origin: Position) -> Option<Entity> {
        let filter = NearbyFilter::within(self.config.hostile_range).with_tags(EntityTags::HOSTILE);
        host.snapshot_nearby(&filter).await.into_iter().min_by_key(|e| {
            (
                !e.tags.contains(EntityTags::ATTACKING),
                origin.distance_to(e.position),
                e.id,
            )
        })
    }

    async fn prompted<H: Host + ?Sized>(&self, host: &H, actor: Actor, target: TargetRef) -> bool {
        let Some(handle) = host.use_capability(&actor, None).await else {
            return false;
        };
        if !host.wait_for_prompt(handle, self.prompt_timeout).await {
            return false;
        }
        host.resolve_prompt(handle, &target).await;
        true
    }

    async fn try_heal<H: Host + ?Sized>(&mut self, host: &H, status: &SelfStatus) -> bool {
        match self.config.heal.clone() {
            HealMethod::None => false,
            HealMethod::Bandage { kind, cooldown_ms } => {
                let cooldown = Duration::from_millis(cooldown_ms);
                if self.last_bandage.is_some_and(|at| at.elapsed() < cooldown) {
                    return false;
                }
                let Some(bandage) = host.inventory_find(kind, ContainerScope::Backpack).await else {
                    return false;
                };
                let applied = self
                    .prompted(host, Actor::Item(bandage), TargetRef::Myself)
                    .await;
                if applied {
                    self.last_bandage = Some(Instant::now());
                }
                applied
            }
            HealMethod::Spell {
                small,
                large,
                small_cost,
                large_cost,
                large_deficit,
            } => {
                let mana = status.resources.mana.current;
                let spell = if status.health.deficit() > large_deficit && mana >= large_cost {
                    large
                } else if mana >= small_cost {
                    small
                } else {
                    return false;
                };
                self.prompted(host, Actor::Skill(spell), TargetRef::Myself).await
            }
        }
    }

    async fn strike<H: Host + ?Sized>(&self, host: &H, hostile: &Entity) -> bool {
        match &self.config.offense {
            Offense::Attack => {
                host.use_capability(
                    &Actor::Skill("attack".into()),
                    Some(&TargetRef::Object(hostile.id)),
                )
                .await;
                true
            }
            Offense::Skill(skill) => {
                self.prompted(host, Actor::Skill(skill.clone()), TargetRef::Object(hostile.id))
                    .await
            }
        }
    }

    async fn equip<H: Host + ?Sized>(&self, host: &H, kinds: &[KindTag]) -> bool {
        match find_any(host, kinds, ContainerScope::Backpack).await {
            Some(item) => host.move_item(&item, ContainerScope::Equipped, 1).await,
            None => false,
        }
    }

    /// Runs rounds until the area is clear and health restored, or the round
    /// budget is spent. Re-equips the tool if a weapon was drawn.
    pub async fn run<H: Host + ?Sized>(&mut self, host: &H, trigger: RecoveryTrigger) -> CombatSummary {
        let heal_below = self
            .config
            .heal_below_percent
            .unwrap_or(self.config.restore_percent);
        let mut summary = CombatSummary {
            rounds: 0,
            heals: 0,
            strikes: 0,
            exit: CombatExit::RoundLimit,
        };
        let mut armed = false;

        debug!(target: "agent::combat", ?trigger, "combat response started");

        while summary.rounds < self.config.max_rounds {
            summary.rounds += 1;
            let status = host.snapshot_self().await;
            let percent = status.health.percent();
            let hostile = self.pick_hostile(host, status.position).await;

            let threshold = if hostile.is_some() {
                heal_below
            } else {
                self.config.restore_percent
            };

            if hostile.is_none() && percent >= self.config.restore_percent {
                summary.exit = CombatExit::Cleared;
                break;
            }

            if percent < threshold && self.try_heal(host, &status).await {
                summary.heals += 1;
            } else if let Some(hostile) = &hostile {
                if !armed && let Some(weapon) = self.config.weapon {
                    armed = self.equip(host, &[weapon]).await;
                }
                if self.strike(host, hostile).await {
                    summary.strikes += 1;
                }
            } else if !self.can_heal_later(host, &status).await {
                summary.exit = CombatExit::Unhealed;
                break;
            }

            sleep(self.config.round_interval()).await;
        }

        if armed && !self.tool_kinds.is_empty() && !self.equip(host, &self.tool_kinds).await {
            warn!(target: "agent::combat", "could not re-equip tool after combat");
        }

        info!(
            target: "agent::combat",
            rounds = summary.rounds,
            heals = summary.heals,
            strikes = summary.strikes,
            exit = ?summary.exit,
            "combat response finished"
        );
        summary
    }

    /// Whether waiting another round could still produce a heal (bandage cooling down).
    async fn can_heal_later<H: Host + ?Sized>(&self, host: &H, status: &SelfStatus) -> bool {
        match &self.config.heal {
            HealMethod::None => false,
            HealMethod::Bandage { kind, .. } => {
                host.inventory_count(*kind, ContainerScope::Backpack).await > 0
            }
            HealMethod::Spell { small_cost, .. } => status.resources.mana.current >= *small_cost,
        }
    }
}
