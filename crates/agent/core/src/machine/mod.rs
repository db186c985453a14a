//! The orchestrator: one parametrised task loop for every profile.
//!
//! Each [`AgentStateMachine::tick`] does exactly one thing:
//!
//! 1. In `Recovering` / `Depositing`, run that sub-task and return to `Idle`.
//! 2. Otherwise observe the world and evaluate the guards. If one fires, handle
//!    it (the in-flight target, if any, is dropped) and stop.
//! 3. Otherwise advance the main task by one state.
//!
//! Every wait inside a tick is bounded, so a tick always returns.

mod report;

pub use report::{RunReport, RunStats};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::action::{ActionExecutor, Outcome, OutcomeClassifier};
use crate::config::{AgentConfig, SuccessPolicy};
use crate::env::{Host, find_any};
use crate::error::{AgentError, ConfigError, ErrorSeverity, TerminationReason};
use crate::hooks::{HookContext, HookRegistry};
use crate::interrupt::{
    CombatResponse, Interrupt, InterruptController, InventoryTrigger, RecoveryTrigger,
};
use crate::inventory::{InventoryCoordinator, InventoryOutcome};
use crate::state::{
    AgentState, ContainerScope, Entity, EntityId, NearbyFilter, PendingAction, SelfStatus,
    TaskMemory,
};
use crate::targeting::TargetSelector;

pub struct AgentStateMachine {
    config: AgentConfig,
    host: Arc<dyn Host>,
    selector: TargetSelector,
    executor: ActionExecutor,
    classifier: OutcomeClassifier,
    interrupts: InterruptController,
    combat: CombatResponse,
    inventory: InventoryCoordinator,
    hooks: HookRegistry,
    memory: TaskMemory,
    attempts: HashMap<EntityId, u32>,
    state: AgentState,
    idle_streak: u32,
    tier: Option<usize>,
    stats: RunStats,
}

impl AgentStateMachine {
    /// Validates the profile against the live world and builds the machine.
    ///
    /// # Errors
    ///
    /// [`AgentError::ConfigurationInvalid`] when the profile is malformed, no
    /// training tier matches the current proficiency, or the difficulty band is
    /// empty. No host side effects happen before this check passes.
    pub async fn start(config: AgentConfig, host: Arc<dyn Host>) -> Result<Self, AgentError> {
        config.validate()?;
        let selector = TargetSelector::from_config(&config.selector)?;

        let status = host.snapshot_self().await;
        let proficiency = status.resources.proficiency;

        if let Some(plan) = &config.plan {
            plan.check_start(proficiency)?;
        }
        if let Some((min, max)) = selector.band_limits(proficiency)
            && selector.eligible_kinds(proficiency).is_empty()
        {
            return Err(ConfigError::EmptyDifficultyBand { min, max }.into());
        }

        let mut interrupts = InterruptController::from_config(&config);
        interrupts.rebaseline(status.health.current);

        let mut machine = Self {
            executor: ActionExecutor::from_config(&config),
            classifier: OutcomeClassifier::new(&config.patterns, config.timing.poll_interval()),
            combat: CombatResponse::from_config(&config),
            inventory: InventoryCoordinator::from_config(&config),
            hooks: HookRegistry::from_config(&config.hooks),
            memory: TaskMemory::new(config.thresholds.memory_capacity),
            attempts: HashMap::new(),
            state: AgentState::Idle,
            idle_streak: 0,
            tier: None,
            stats: RunStats::default(),
            interrupts,
            selector,
            host,
            config,
        };
        let host = Arc::clone(&machine.host);
        if let Some(stop) = machine.refresh_tier(&*host, proficiency).await {
            machine.state = stop;
        }

        info!(
            target: "agent::machine",
            profile = %machine.config.name,
            strategy = machine.selector.current_strategy_name(),
            ranking = machine.selector.current_strategy_description(),
            capability = machine.executor.capability_name(),
            guards = ?machine.interrupts.guard_names(),
            hooks = ?machine.hooks.names(),
            "agent started"
        );
        Ok(machine)
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn memory(&self) -> &TaskMemory {
        &self.memory
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Retryable failures recorded against `id` since it was last exhausted.
    pub fn attempts_for(&self, id: EntityId) -> u32 {
        self.attempts.get(&id).copied().unwrap_or(0)
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    /// Advances the machine by one step and returns the new state.
    pub async fn tick(&mut self) -> &AgentState {
        if self.state.is_terminated() {
            return &self.state;
        }
        self.stats.ticks += 1;

        let host = Arc::clone(&self.host);
        let state = std::mem::take(&mut self.state);
        let from = state.label();

        let next = match state {
            AgentState::Recovering { trigger } => self.recover(&*host, trigger).await,
            AgentState::Depositing { trigger } => self.unload(&*host, trigger).await,
            active => {
                let observation = self.interrupts.observe(&*host).await;
                match self.interrupts.evaluate(&observation) {
                    Some(interrupt) => {
                        if let Some(target) = active.target() {
                            self.attempts.remove(&target.id);
                            debug!(
                                target: "agent::machine",
                                target_id = %target.id,
                                ?interrupt,
                                "main task preempted"
                            );
                        }
                        self.handle_interrupt(&*host, interrupt).await
                    }
                    None => self.advance(&*host, active, &observation.status).await,
                }
            }
        };

        if next.label() != from {
            debug!(target: "agent::machine", from, to = next.label(), "state transition");
        }
        if let AgentState::Terminated { reason } = &next {
            info!(
                target: "agent::machine",
                reason = %reason,
                label = reason.label(),
                "agent terminated"
            );
        }

        self.state = next;
        &self.state
    }

    /// Ticks until the agent terminates or `max_ticks` have run.
    pub async fn run(&mut self, max_ticks: Option<u64>) -> RunReport {
        let mut ran = 0u64;
        while !self.is_terminated() && max_ticks.is_none_or(|limit| ran < limit) {
            self.tick().await;
            ran += 1;
        }
        RunReport {
            stats: self.stats,
            final_state: self.state.clone(),
        }
    }

    // ========================================================================
    // Interrupts and sub-tasks
    // ========================================================================

    async fn handle_interrupt(&mut self, host: &dyn Host, interrupt: Interrupt) -> AgentState {
        match interrupt {
            Interrupt::Flee { percent } => {
                warn!(target: "agent::machine", percent, "health critical, retreating");
                if let Some(spot) = self.config.combat.safe_spot
                    && !host.travel_to(spot, self.config.timing.travel_timeout()).await
                {
                    error!(target: "agent::machine", %spot, "could not reach safe spot");
                }
                AgentState::Terminated {
                    reason: TerminationReason::HealthCritical { percent },
                }
            }
            Interrupt::Recover(trigger) => AgentState::Recovering { trigger },
            Interrupt::ToolMissing => self.replace_tool(host).await,
            Interrupt::PlanComplete { proficiency } => {
                self.recycle(host).await;
                AgentState::Terminated {
                    reason: TerminationReason::PlanComplete { proficiency },
                }
            }
            Interrupt::Inventory(trigger) => AgentState::Depositing { trigger },
        }
    }

    async fn recover(&mut self, host: &dyn Host, trigger: RecoveryTrigger) -> AgentState {
        self.combat.run(host, trigger).await;
        self.stats.recoveries += 1;
        let health = host.snapshot_self().await.health.current;
        self.interrupts.rebaseline(health);
        AgentState::Idle
    }

    async fn unload(&mut self, host: &dyn Host, trigger: InventoryTrigger) -> AgentState {
        match self.inventory.check_and_run(host, trigger).await {
            Ok(outcome) => {
                match outcome {
                    InventoryOutcome::Deposited { .. } => self.stats.deposits += 1,
                    InventoryOutcome::Converted { .. } => self.stats.conversions += 1,
                    InventoryOutcome::Restocked { .. } => self.stats.restocks += 1,
                    InventoryOutcome::Disposed { .. } => self.stats.disposals += 1,
                    InventoryOutcome::Unchanged => {}
                }
                debug!(target: "agent::machine", ?outcome, "inventory handled");
                AgentState::Idle
            }
            Err(reason) => AgentState::Terminated { reason },
        }
    }

    /// One-shot lookup for a spare tool in the backpack.
    async fn replace_tool(&mut self, host: &dyn Host) -> AgentState {
        let (name, kinds) = match &self.config.tool {
            Some(tool) => (tool.name.clone(), tool.kinds.clone()),
            None => return AgentState::Idle,
        };

        if let Some(spare) = find_any(host, &kinds, ContainerScope::Backpack).await
            && host.move_item(&spare, ContainerScope::Equipped, 1).await
        {
            self.stats.tool_replacements += 1;
            info!(target: "agent::machine", tool = %name, kind = %spare.kind, "equipped spare tool");
            return AgentState::Idle;
        }

        self.terminate(host, AgentError::ToolExhausted { tool: name }.into())
            .await
    }

    /// Terminates, unloading first when the profile asks for a final deposit.
    async fn terminate(&mut self, host: &dyn Host, reason: TerminationReason) -> AgentState {
        if self.inventory.finishes_with_deposit() {
            match self.inventory.final_deposit(host).await {
                Ok(moved) => {
                    self.stats.deposits += 1;
                    info!(target: "agent::machine", moved, "final deposit done");
                }
                Err(failure) => {
                    error!(target: "agent::machine", error = %failure, "final deposit failed");
                }
            }
        }
        AgentState::Terminated { reason }
    }

    // ========================================================================
    // Main task
    // ========================================================================

    async fn advance(&mut self, host: &dyn Host, state: AgentState, status: &SelfStatus) -> AgentState {
        match state {
            AgentState::Idle => self.idle(host, status).await,
            AgentState::Acquiring { target } => self.acquire(host, target).await,
            AgentState::Traveling { target } => self.travel(host, target, status).await,
            AgentState::Interacting { target } => self.interact(host, target).await,
            AgentState::AwaitingOutcome { target, pending } => {
                self.await_outcome(host, target, pending).await
            }
            other => other,
        }
    }

    /// Re-evaluates the training tier and swaps capability/material on change.
    /// Leaving a tier recycles its crafted output first.
    ///
    /// Returns a terminal state when proficiency falls into no tier.
    async fn refresh_tier(&mut self, host: &dyn Host, proficiency: f32) -> Option<AgentState> {
        let plan = self.config.plan.as_ref()?;
        if plan.is_complete(proficiency) {
            return None;
        }
        let Some(index) = plan.tier_for(proficiency) else {
            let error = AgentError::from(ConfigError::NoTierForProficiency { proficiency });
            return Some(AgentState::Terminated {
                reason: error.into(),
            });
        };
        if self.tier == Some(index) {
            return None;
        }

        let tier = plan.tier(index)?.clone();
        if self.tier.is_some() {
            self.recycle(host).await;
        }
        info!(
            target: "agent::machine",
            tier = %tier.name,
            capability = %tier.capability,
            proficiency,
            "training tier selected"
        );
        self.executor.set_capability_name(tier.capability);
        if let Some(restock) = &self.config.inventory.restock {
            let amount = tier.material.map(|m| m.amount);
            self.interrupts
                .set_material_floor(Some((restock.kind, amount.unwrap_or(restock.floor))));
            self.inventory.set_material_floor(amount);
        }
        self.tier = Some(index);
        None
    }

    /// Whether proficiency has left the tier the machine is working.
    async fn tier_changed(&self, host: &dyn Host) -> bool {
        let Some(plan) = &self.config.plan else {
            return false;
        };
        let proficiency = host.snapshot_self().await.resources.proficiency;
        plan.tier_for(proficiency) != self.tier
    }

    async fn recycle(&mut self, host: &dyn Host) {
        let Some(recycle) = self.config.plan.as_ref().and_then(|p| p.recycle.as_ref()) else {
            return;
        };
        let batches = self.inventory.recycle(host, recycle).await;
        self.stats.recycled += batches;
    }

    async fn idle(&mut self, host: &dyn Host, status: &SelfStatus) -> AgentState {
        if let Some(stop) = self.refresh_tier(host, status.resources.proficiency).await {
            return stop;
        }

        let choice = match self.selector.query(status) {
            Some(filter) => {
                let candidates = host.snapshot_nearby(&filter).await;
                self.selector.select(candidates, &self.memory, status.position)
            }
            None => None,
        };

        let Some(target) = choice else {
            return self.no_target(host).await;
        };

        self.idle_streak = 0;
        debug!(
            target: "agent::machine",
            target_id = %target.id,
            kind = %target.kind,
            distance = status.position.distance_to(target.position),
            "target selected"
        );
        AgentState::Acquiring { target }
    }

    async fn no_target(&mut self, host: &dyn Host) -> AgentState {
        self.idle_streak += 1;
        if let Some(limit) = self.config.thresholds.idle_limit
            && self.idle_streak >= limit
        {
            let reason = TerminationReason::NoTargets {
                idle_waits: self.idle_streak,
            };
            return self.terminate(host, reason).await;
        }
        sleep(self.config.timing.idle_wait()).await;
        AgentState::Idle
    }

    /// Confirms the target still exists before walking to it.
    async fn acquire(&mut self, host: &dyn Host, target: Entity) -> AgentState {
        let filter = NearbyFilter::within(self.config.selector.search_radius)
            .with_kinds(vec![target.kind]);
        let current = host
            .snapshot_nearby(&filter)
            .await
            .into_iter()
            .find(|e| e.id == target.id);

        match current {
            Some(target) => AgentState::Traveling { target },
            None => {
                debug!(target: "agent::machine", target_id = %target.id, "target disappeared");
                self.attempts.remove(&target.id);
                AgentState::Idle
            }
        }
    }

    async fn travel(&mut self, host: &dyn Host, target: Entity, status: &SelfStatus) -> AgentState {
        if status.position.distance_to(target.position) <= self.config.thresholds.approach_range {
            return AgentState::Interacting { target };
        }

        if host
            .travel_to(target.position, self.config.timing.travel_timeout())
            .await
        {
            AgentState::Interacting { target }
        } else {
            self.stats.travel_failures += 1;
            self.exhaust(&target, &AgentError::TargetUnreachable { target: target.id });
            AgentState::Idle
        }
    }

    async fn interact(&mut self, host: &dyn Host, target: Entity) -> AgentState {
        match self.executor.perform(host, &target).await {
            Ok(pending) => {
                self.stats.attempts += 1;
                AgentState::AwaitingOutcome { target, pending }
            }
            Err(AgentError::ToolExhausted { .. }) => {
                // Tool vanished between the guard check and the interaction.
                AgentState::Idle
            }
            Err(error) if error.severity() == ErrorSeverity::Recoverable => {
                self.stats.prompt_timeouts += 1;
                self.exhaust(&target, &error);
                AgentState::Idle
            }
            Err(error) => self.terminate(host, error.into()).await,
        }
    }

    async fn await_outcome(
        &mut self,
        host: &dyn Host,
        target: Entity,
        pending: PendingAction,
    ) -> AgentState {
        let outcome = self.classifier.classify(host, pending.remaining()).await;

        let next = match outcome {
            Outcome::Success { pattern } => self.on_success(host, target, &pattern).await,
            Outcome::Failure { pattern } if self.config.patterns.is_terminal(&pattern) => {
                self.stats.terminal_failures += 1;
                debug!(target: "agent::machine", target_id = %target.id, %pattern, "terminal failure");
                self.exhaust_silently(target.id);
                AgentState::Idle
            }
            Outcome::Failure { pattern } => {
                debug!(target: "agent::machine", target_id = %target.id, %pattern, "attempt failed");
                self.record_failure(target)
            }
            Outcome::Timeout => {
                self.stats.outcome_timeouts += 1;
                let error = AgentError::OutcomeTimeout {
                    target: target.id,
                    window: pending.deadline - pending.issued_at,
                };
                debug!(target: "agent::machine", %error, "no outcome");
                self.record_failure(target)
            }
        };

        let cooldown = self.config.timing.action_cooldown();
        if !cooldown.is_zero() {
            sleep(cooldown).await;
        }
        next
    }

    async fn on_success(&mut self, host: &dyn Host, target: Entity, pattern: &str) -> AgentState {
        self.stats.successes += 1;
        info!(target: "agent::machine", target_id = %target.id, %pattern, "attempt succeeded");

        if !self.hooks.is_empty() {
            let status = host.snapshot_self().await;
            let ctx = HookContext {
                target: &target,
                pattern,
                status: &status,
            };
            if let Err(e) = self.hooks.execute(&ctx, host).await {
                error!(target: "agent::machine", error = %e, "post-success hook failed");
            }
        }

        match self.config.success_policy {
            SuccessPolicy::Exhaust => {
                self.exhaust_silently(target.id);
                AgentState::Idle
            }
            SuccessPolicy::Repeat => {
                self.attempts.remove(&target.id);
                // Idle picks up the new tier before the next repeat.
                if self.tier_changed(host).await {
                    return AgentState::Idle;
                }
                AgentState::Acquiring { target }
            }
        }
    }

    /// Counts a retryable failure; past the attempt cap the target is exhausted.
    fn record_failure(&mut self, target: Entity) -> AgentState {
        self.stats.failures += 1;
        let count = self.attempts.entry(target.id).or_insert(0);
        *count += 1;
        let count = *count;

        let cap = self.config.thresholds.maximum_attempts;
        if cap > 0 && count > cap {
            debug!(target: "agent::machine", target_id = %target.id, count, "attempt cap reached");
            self.exhaust_silently(target.id);
            AgentState::Idle
        } else {
            AgentState::Traveling { target }
        }
    }

    fn exhaust(&mut self, target: &Entity, cause: &AgentError) {
        debug!(target: "agent::machine", target_id = %target.id, error = %cause, "target exhausted");
        self.exhaust_silently(target.id);
    }

    fn exhaust_silently(&mut self, id: EntityId) {
        self.attempts.remove(&id);
        self.stats.exhausted += 1;
        if let Some(evicted) = self.memory.remember(id) {
            debug!(target: "agent::machine", evicted = %evicted, "task memory full, oldest forgotten");
        }
    }
}
