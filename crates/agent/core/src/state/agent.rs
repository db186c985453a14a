use tokio::time::Instant;

use super::{Entity, EntityId};
use crate::error::TerminationReason;
use crate::interrupt::InventoryTrigger;
use crate::interrupt::RecoveryTrigger;

/// The single active state of an agent.
///
/// States carrying a target own a snapshot of it as of selection; the world may
/// have moved on since, so every step re-reads what it needs.
#[derive(Clone, Debug, PartialEq, strum::IntoStaticStr)]
pub enum AgentState {
    Idle,
    Acquiring { target: Entity },
    Traveling { target: Entity },
    Interacting { target: Entity },
    AwaitingOutcome { target: Entity, pending: PendingAction },
    Recovering { trigger: RecoveryTrigger },
    Depositing { trigger: InventoryTrigger },
    Terminated { reason: TerminationReason },
}

impl AgentState {
    pub fn label(&self) -> &'static str {
        self.into()
    }

    /// Target the main task is currently working on, if any.
    pub fn target(&self) -> Option<&Entity> {
        match self {
            Self::Acquiring { target }
            | Self::Traveling { target }
            | Self::Interacting { target }
            | Self::AwaitingOutcome { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }

    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        match self {
            Self::Terminated { reason } => Some(reason),
            _ => None,
        }
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Idle
    }
}

/// An interaction that has been issued and is waiting for its outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAction {
    pub target: EntityId,
    pub capability: String,
    pub issued_at: Instant,
    pub deadline: Instant,
}

impl PendingAction {
    /// Time left in the outcome window, zero once the deadline has passed.
    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
