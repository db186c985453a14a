//! Post-success hook system.
//!
//! Hooks run after an interaction is classified as a success and before the
//! target is marked exhausted: naming and releasing tamed pets, looting corpses,
//! dropping harvested material on the spot.
//!
//! # Architecture
//!
//! - Hooks are built from the profile's [`HookConfig`] list and sorted by priority
//! - Each hook decides via [`SuccessHook::should_trigger`] whether it applies
//! - Failures are handled according to [`HookCriticality`]

mod builtin;
mod context;
mod registry;

pub use builtin::{DiscardHook, LootHook, ReleaseHook, RenameHook};
pub use context::HookContext;
pub use registry::HookRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DisposeTo;
use crate::env::Host;
use crate::state::{EntityId, KindTag};

/// Defines the criticality level of a hook for error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookCriticality {
    /// Failure is reported to the caller.
    Critical,

    /// Failure is logged as a warning and the remaining hooks still run.
    Important,

    /// Failure is logged at debug level.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("host refused to {action} {target}")]
    Refused { action: &'static str, target: EntityId },

    #[error("hook `{hook}` failed: {source}")]
    Critical {
        hook: &'static str,
        #[source]
        source: Box<HookError>,
    },
}

/// Side effect run after a successful interaction.
///
/// # Execution Order
///
/// Hooks are sorted by priority (lower values execute first). Renaming a pet
/// must happen before releasing surplus ones, so the built-ins use
/// rename=-10, loot=0, discard=10, release=20.
#[async_trait]
pub trait SuccessHook: Send + Sync {
    /// Returns a human-readable name for this hook (used in logging and debugging).
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32 {
        0
    }

    fn criticality(&self) -> HookCriticality {
        HookCriticality::Important
    }

    fn should_trigger(&self, _ctx: &HookContext<'_>) -> bool {
        true
    }

    async fn run(&self, ctx: &HookContext<'_>, host: &dyn Host) -> Result<(), HookError>;
}

/// Profile entry describing one hook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookConfig {
    Rename {
        name: String,
    },
    Release {
        /// Release newly tamed pets once this many followers are active.
        keep_followers: u32,
    },
    Loot {
        kinds: Vec<KindTag>,
        #[serde(default = "default_loot_limit")]
        max_items: u32,
    },
    Discard {
        kinds: Vec<KindTag>,
        #[serde(default)]
        destination: DisposeTo,
    },
}

fn default_loot_limit() -> u32 {
    20
}

impl HookConfig {
    pub fn build(&self) -> Arc<dyn SuccessHook> {
        match self {
            Self::Rename { name } => Arc::new(RenameHook { name: name.clone() }),
            Self::Release { keep_followers } => Arc::new(ReleaseHook {
                keep_followers: *keep_followers,
            }),
            Self::Loot { kinds, max_items } => Arc::new(LootHook {
                kinds: kinds.clone(),
                max_items: *max_items,
            }),
            Self::Discard { kinds, destination } => Arc::new(DiscardHook {
                kinds: kinds.clone(),
                destination: *destination,
            }),
        }
    }
}
