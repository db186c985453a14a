//! Hook registry for managing and executing post-success hooks.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{HookConfig, HookContext, HookCriticality, HookError, SuccessHook};
use crate::env::Host;

/// Ordered set of post-success hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Arc<[Arc<dyn SuccessHook>]>,
}

impl HookRegistry {
    /// Creates a registry; hooks are sorted by priority (lower values first).
    pub fn new(mut hooks: Vec<Arc<dyn SuccessHook>>) -> Self {
        hooks.sort_by_key(|h| h.priority());
        Self {
            hooks: hooks.into(),
        }
    }

    pub fn from_config(configs: &[HookConfig]) -> Self {
        Self::new(configs.iter().map(HookConfig::build).collect())
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Runs every triggered hook in priority order.
    ///
    /// # Error Handling
    ///
    /// - `Critical`: stops and returns the error
    /// - `Important`: logs a warning and continues
    /// - `Optional`: logs at debug level and continues
    pub async fn execute(&self, ctx: &HookContext<'_>, host: &dyn Host) -> Result<(), HookError> {
        for hook in self.hooks.iter() {
            if !hook.should_trigger(ctx) {
                continue;
            }
            if let Err(e) = hook.run(ctx, host).await {
                self.handle_hook_error(hook.as_ref(), e)?;
            }
        }
        Ok(())
    }

    fn handle_hook_error(&self, hook: &dyn SuccessHook, error: HookError) -> Result<(), HookError> {
        match hook.criticality() {
            HookCriticality::Critical => Err(HookError::Critical {
                hook: hook.name(),
                source: Box::new(error),
            }),
            HookCriticality::Important => {
                warn!(target: "agent::hooks", hook = hook.name(), error = %error, "hook failed");
                Ok(())
            }
            HookCriticality::Optional => {
                debug!(target: "agent::hooks", hook = hook.name(), error = %error, "optional hook failed");
                Ok(())
            }
        }
    }
}
