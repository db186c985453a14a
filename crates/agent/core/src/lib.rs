//! Interrupt-aware task loop for autonomous field agents.
//!
//! An agent repeatedly perceives the world, chooses a target, travels to it,
//! performs a timed interaction, verifies the outcome from an asynchronous event
//! feed, and reacts to interrupts (being attacked, low health, full pack, broken
//! tool). Everything that differs between a lumberjack, a tamer and a crafter is
//! configuration; the loop is shared.
//!
//! Modules are organized by responsibility:
//! - [`state`] holds the data model and [`TaskMemory`]
//! - [`env`] defines the capabilities a host world must supply
//! - [`targeting`] filters and ranks candidates
//! - [`action`] issues interactions and classifies their outcome
//! - [`interrupt`] evaluates guards and runs the combat sub-loop
//! - [`inventory`] runs restock, conversion, deposit and disposal sub-tasks
//! - [`hooks`] runs post-success side effects
//! - [`machine`] composes all of the above into [`AgentStateMachine`]
pub mod action;
pub mod config;
pub mod env;
pub mod error;
pub mod hooks;
pub mod interrupt;
pub mod inventory;
pub mod machine;
pub mod plan;
pub mod state;
pub mod targeting;

#[cfg(test)]
mod mock;

pub use action::{ActionExecutor, Outcome, OutcomeClassifier};
pub use config::{
    AgentConfig, CapabilityConfig, CapabilityVia, CombatConfig, ConversionConfig, ConversionVia,
    DepositConfig, DifficultyBand, DisposeTo, HealMethod, InventoryConfig, Offense,
    OutcomePatterns, OverflowPolicy, RestockConfig, SelectorConfig, SuccessPolicy,
    ThresholdConfig, TimingConfig, ToolConfig, TrackedStock,
};
pub use env::{
    Actor, Companions, EventFeed, Host, Interaction, ItemMover, Navigator, PromptHandle,
    TargetRef, WorldView,
};
pub use error::{AgentError, ConfigError, ErrorSeverity, Result, TerminationReason};
pub use hooks::{HookConfig, HookContext, HookCriticality, HookError, HookRegistry, SuccessHook};
pub use interrupt::{
    CombatExit, CombatResponse, CombatSummary, Guard, Interrupt, InterruptController,
    InventoryTrigger, Observation, RecoveryTrigger,
};
pub use inventory::{InventoryCoordinator, InventoryOutcome};
pub use machine::{AgentStateMachine, RunReport, RunStats};
pub use plan::{MaterialNeed, Recycle, TrainingPlan, TrainingTier};
pub use state::{
    AgentState, ContainerScope, Entity, EntityId, EntityTags, ItemRef, KindTag, NearbyFilter,
    PendingAction, Position, ResourceMeter, Resources, SelfStatus, TaskMemory,
};
pub use targeting::{CandidateSet, RankingStrategy, TargetSelector};
