//! Run counters and the final report.

use std::fmt;

use crate::error::TerminationReason;
use crate::state::AgentState;

/// Counters accumulated over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub attempts: u32,
    pub successes: u32,
    /// Retryable failures, outcome timeouts included.
    pub failures: u32,
    pub terminal_failures: u32,
    pub outcome_timeouts: u32,
    pub prompt_timeouts: u32,
    pub travel_failures: u32,
    pub exhausted: u32,
    pub recoveries: u32,
    pub tool_replacements: u32,
    pub deposits: u32,
    pub conversions: u32,
    pub restocks: u32,
    pub disposals: u32,
    /// Crafted stacks melted back into material.
    pub recycled: u32,
}

/// Outcome of [`AgentStateMachine::run`](super::AgentStateMachine::run).
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub stats: RunStats,
    pub final_state: AgentState,
}

impl RunReport {
    pub fn termination(&self) -> Option<&TerminationReason> {
        self.final_state.termination_reason()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        write!(
            f,
            "{} ticks, {} attempts ({} ok, {} failed, {} timed out), {} exhausted, {} deposits, {} recoveries",
            s.ticks,
            s.attempts,
            s.successes,
            s.failures + s.terminal_failures,
            s.outcome_timeouts + s.prompt_timeouts,
            s.exhausted,
            s.deposits,
            s.recoveries,
        )?;
        match self.termination() {
            Some(reason) => write!(f, "; stopped: {reason}"),
            None => write!(f, "; still {}", self.final_state.label()),
        }
    }
}
