//! Error taxonomy for the agent core.
//!
//! Per-target failures ([`ErrorSeverity::Recoverable`]) are absorbed by the state
//! machine: the target is marked exhausted and selection continues. Resource
//! exhaustion ([`ErrorSeverity::Fatal`]) ends the run through
//! [`TerminationReason`]. Configuration problems surface before the loop starts.

use std::time::Duration;

use thiserror::Error;

use crate::state::{EntityId, KindTag, Position};

pub type Result<T> = std::result::Result<T, AgentError>;

/// How an error is handled by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Scoped to one target: exhaust it and carry on.
    Recoverable,
    /// No safe continuation exists; the run terminates with a reason.
    Fatal,
    /// Precondition failure detected before the main loop.
    Startup,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Fatal => "fatal",
            Self::Startup => "startup",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("target {target} could not be reached")]
    TargetUnreachable { target: EntityId },

    #[error("no target prompt for {capability} on {target} within {timeout:?}")]
    TargetPromptTimeout {
        target: EntityId,
        capability: String,
        timeout: Duration,
    },

    #[error("no outcome message for {target} within {window:?}")]
    OutcomeTimeout { target: EntityId, window: Duration },

    #[error("out of {tool}: no replacement found")]
    ToolExhausted { tool: String },

    #[error("drop-off at {site} is unreachable")]
    DepositUnreachable { site: Position },

    #[error("supply of {kind} is exhausted")]
    SupplyExhausted { kind: KindTag },

    #[error(transparent)]
    ConfigurationInvalid(#[from] ConfigError),
}

impl AgentError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TargetUnreachable { .. }
            | Self::TargetPromptTimeout { .. }
            | Self::OutcomeTimeout { .. } => ErrorSeverity::Recoverable,
            Self::ToolExhausted { .. }
            | Self::DepositUnreachable { .. }
            | Self::SupplyExhausted { .. } => ErrorSeverity::Fatal,
            Self::ConfigurationInvalid(_) => ErrorSeverity::Startup,
        }
    }
}

/// Reasons a profile is rejected before the loop begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown ranking strategy `{0}`")]
    UnknownStrategy(String),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("poll interval {poll_ms}ms exceeds outcome window {window_ms}ms")]
    PollExceedsWindow { poll_ms: u64, window_ms: u64 },

    #[error("no success patterns configured")]
    NoSuccessPatterns,

    #[error("capability `{0}` uses the equipped tool but no tool kinds are configured")]
    MissingToolKinds(String),

    #[error("difficulty band [{min:.1}, {max:.1}] contains no known kinds")]
    EmptyDifficultyBand { min: f32, max: f32 },

    #[error("no training tier covers proficiency {proficiency:.1}")]
    NoTierForProficiency { proficiency: f32 },

    #[error("training tier `{name}` has an empty range [{min:.1}, {max:.1})")]
    InvalidTier { name: String, min: f32, max: f32 },

    #[error("{0} percentage must be within 1..=100")]
    InvalidPercent(&'static str),

    #[error("flee threshold configured without a safe spot")]
    MissingSafeSpot,

    #[error("deposit configured without any kinds to deposit")]
    EmptyDeposit,

    #[error("tracked kind {0} is never deposited, disposed of or converted")]
    UnloadedStock(KindTag),
}

/// Why an agent entered the terminal state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerminationReason {
    #[error(transparent)]
    Fault(#[from] AgentError),

    #[error("no reachable targets after {idle_waits} empty scans")]
    NoTargets { idle_waits: u32 },

    #[error("carrying {weight}/{maximum} stones with nowhere to unload")]
    Overweight { weight: u32, maximum: u32 },

    #[error("health fell to {percent}%, retreated to safety")]
    HealthCritical { percent: u32 },

    #[error("proficiency {proficiency:.1} completed the training plan")]
    PlanComplete { proficiency: f32 },
}

impl TerminationReason {
    /// Short machine-friendly label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fault(AgentError::ToolExhausted { .. }) => "tool_exhausted",
            Self::Fault(AgentError::DepositUnreachable { .. }) => "deposit_unreachable",
            Self::Fault(AgentError::SupplyExhausted { .. }) => "supply_exhausted",
            Self::Fault(_) => "fault",
            Self::NoTargets { .. } => "no_targets",
            Self::Overweight { .. } => "overweight",
            Self::HealthCritical { .. } => "health_critical",
            Self::PlanComplete { .. } => "plan_complete",
        }
    }
}
