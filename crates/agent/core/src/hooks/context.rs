//! Execution context provided to hooks.

use crate::state::{Entity, SelfStatus};

/// What a hook gets to see about the success it is reacting to.
pub struct HookContext<'a> {
    /// Target as it was when selected.
    pub target: &'a Entity,

    /// Success phrase that classified the attempt.
    pub pattern: &'a str,

    /// Agent status read right after classification.
    pub status: &'a SelfStatus,
}
