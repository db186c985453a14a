//! Built-in post-success hooks.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{HookContext, HookCriticality, HookError, SuccessHook};
use crate::config::DisposeTo;
use crate::env::Host;
use crate::state::{ContainerScope, KindTag};

/// Gives a freshly tamed pet a fixed name so later scans can exclude it.
#[derive(Debug, Clone)]
pub struct RenameHook {
    pub name: String,
}

#[async_trait]
impl SuccessHook for RenameHook {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn priority(&self) -> i32 {
        -10
    }

    async fn run(&self, ctx: &HookContext<'_>, host: &dyn Host) -> Result<(), HookError> {
        if host.rename_entity(ctx.target.id, &self.name).await {
            debug!(target: "agent::hooks", id = %ctx.target.id, name = %self.name, "renamed");
            Ok(())
        } else {
            Err(HookError::Refused {
                action: "rename",
                target: ctx.target.id,
            })
        }
    }
}

/// Releases the new pet when the follower count is at or above `keep_followers`.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseHook {
    pub keep_followers: u32,
}

#[async_trait]
impl SuccessHook for ReleaseHook {
    fn name(&self) -> &'static str {
        "release"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn should_trigger(&self, ctx: &HookContext<'_>) -> bool {
        ctx.status.resources.followers.current >= self.keep_followers
    }

    async fn run(&self, ctx: &HookContext<'_>, host: &dyn Host) -> Result<(), HookError> {
        if host.release_entity(ctx.target.id).await {
            info!(target: "agent::hooks", id = %ctx.target.id, "released companion");
            Ok(())
        } else {
            Err(HookError::Refused {
                action: "release",
                target: ctx.target.id,
            })
        }
    }
}

/// Moves wanted kinds out of the target container (a corpse) into the backpack.
#[derive(Debug, Clone)]
pub struct LootHook {
    pub kinds: Vec<KindTag>,
    pub max_items: u32,
}

#[async_trait]
impl SuccessHook for LootHook {
    fn name(&self) -> &'static str {
        "loot"
    }

    fn criticality(&self) -> HookCriticality {
        HookCriticality::Optional
    }

    async fn run(&self, ctx: &HookContext<'_>, host: &dyn Host) -> Result<(), HookError> {
        let source = ContainerScope::Container(ctx.target.id);
        let mut taken = 0;
        'kinds: for kind in &self.kinds {
            while let Some(item) = host.inventory_find(*kind, source).await {
                if taken >= self.max_items {
                    break 'kinds;
                }
                if !host.move_item(&item, ContainerScope::Backpack, 0).await {
                    return Err(HookError::Refused {
                        action: "loot",
                        target: ctx.target.id,
                    });
                }
                taken += 1;
            }
        }
        debug!(target: "agent::hooks", id = %ctx.target.id, taken, "looted");
        Ok(())
    }
}

/// Drops harvested kinds right after each success instead of carrying them.
#[derive(Debug, Clone)]
pub struct DiscardHook {
    pub kinds: Vec<KindTag>,
    pub destination: DisposeTo,
}

#[async_trait]
impl SuccessHook for DiscardHook {
    fn name(&self) -> &'static str {
        "discard"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn criticality(&self) -> HookCriticality {
        HookCriticality::Optional
    }

    async fn run(&self, ctx: &HookContext<'_>, host: &dyn Host) -> Result<(), HookError> {
        let destination = match self.destination {
            DisposeTo::Ground => ContainerScope::Ground,
            DisposeTo::Container(id) => ContainerScope::Container(id),
        };
        for kind in &self.kinds {
            while let Some(item) = host.inventory_find(*kind, ContainerScope::Backpack).await {
                if !host.move_item(&item, destination, 0).await {
                    return Err(HookError::Refused {
                        action: "discard",
                        target: ctx.target.id,
                    });
                }
            }
        }
        Ok(())
    }
}
