//! Performs "use capability X on target Y" against the host.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::{AgentConfig, CapabilityConfig, CapabilityVia};
use crate::env::{Actor, Host, TargetRef, find_any};
use crate::error::AgentError;
use crate::state::{ContainerScope, Entity, ItemRef, KindTag, PendingAction};

/// Turns a selected target into an in-flight [`PendingAction`].
///
/// The executor never retries. A prompt that does not show up within the prompt
/// timeout is reported as [`AgentError::TargetPromptTimeout`] and the caller
/// decides what to do with the target.
#[derive(Clone, Debug)]
pub struct ActionExecutor {
    capability: CapabilityConfig,
    tool_name: String,
    tool_kinds: Vec<KindTag>,
    prompt_timeout: Duration,
    outcome_window: Duration,
}

impl ActionExecutor {
    pub fn new(
        capability: CapabilityConfig,
        prompt_timeout: Duration,
        outcome_window: Duration,
    ) -> Self {
        Self {
            capability,
            tool_name: String::new(),
            tool_kinds: Vec::new(),
            prompt_timeout,
            outcome_window,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        let mut executor = Self::new(
            config.capability.clone(),
            config.timing.prompt_timeout(),
            config.timing.outcome_window(),
        );
        if let Some(tool) = &config.tool {
            executor.tool_name = tool.name.clone();
            executor.tool_kinds = tool.kinds.clone();
        }
        executor
    }

    pub fn capability_name(&self) -> &str {
        &self.capability.name
    }

    /// Swaps the skill/recipe name, e.g. when a training tier changes.
    pub fn set_capability_name(&mut self, name: impl Into<String>) {
        self.capability.name = name.into();
    }

    async fn resolve_actor<H: Host + ?Sized>(
        &self,
        host: &H,
        target: &Entity,
    ) -> Result<Actor, AgentError> {
        match &self.capability.via {
            CapabilityVia::Skill => Ok(Actor::Skill(self.capability.name.clone())),
            CapabilityVia::EquippedTool => {
                find_any(host, &self.tool_kinds, ContainerScope::Equipped)
                    .await
                    .map(Actor::Item)
                    .ok_or_else(|| AgentError::ToolExhausted {
                        tool: self.tool_name.clone(),
                    })
            }
            CapabilityVia::TargetItem => Ok(Actor::Item(ItemRef {
                id: target.id,
                kind: target.kind,
                amount: 1,
                container: ContainerScope::Ground,
            })),
            CapabilityVia::Consumable(kind) => host
                .inventory_find(*kind, ContainerScope::Backpack)
                .await
                .map(Actor::Item)
                .ok_or(AgentError::SupplyExhausted { kind: *kind }),
        }
    }

    /// Issues the interaction on `target`.
    ///
    /// # Returns
    ///
    /// The pending action with a deadline one outcome window from now, or
    /// - [`AgentError::TargetPromptTimeout`] when the host never asked for a target
    /// - [`AgentError::ToolExhausted`] / [`AgentError::SupplyExhausted`] when the
    ///   thing being used is gone
    pub async fn perform<H: Host + ?Sized>(
        &self,
        host: &H,
        target: &Entity,
    ) -> Result<PendingAction, AgentError> {
        let actor = self.resolve_actor(host, target).await?;
        let target_ref = TargetRef::Object(target.id);

        host.clear();

        if self.capability.prompted {
            let prompt_timeout = AgentError::TargetPromptTimeout {
                target: target.id,
                capability: self.capability.name.clone(),
                timeout: self.prompt_timeout,
            };
            let Some(handle) = host.use_capability(&actor, None).await else {
                return Err(prompt_timeout);
            };
            if !host.wait_for_prompt(handle, self.prompt_timeout).await {
                return Err(prompt_timeout);
            }
            host.resolve_prompt(handle, &target_ref).await;
        } else {
            let direct = match &actor {
                Actor::Item(item) if item.id == target.id => None,
                _ => Some(&target_ref),
            };
            host.use_capability(&actor, direct).await;
        }

        debug!(
            target: "agent::action",
            capability = %self.capability.name,
            target_id = %target.id,
            "interaction issued"
        );

        let issued_at = Instant::now();
        Ok(PendingAction {
            target: target.id,
            capability: self.capability.name.clone(),
            issued_at,
            deadline: issued_at + self.outcome_window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::env::EventFeed;
    use crate::mock::MockHost;
    use crate::state::{EntityId, Position};

    const TREE: KindTag = KindTag(0x0CD0);

    fn tree() -> Entity {
        Entity::new(EntityId(7), TREE, Position::new(1, 0, 0))
    }

    fn executor(name: &str, via: CapabilityVia, prompted: bool) -> ActionExecutor {
        ActionExecutor::from_config(&AgentConfig {
            capability: CapabilityConfig {
                name: name.into(),
                via,
                prompted,
            },
            tool: Some(ToolConfig {
                name: "hatchet".into(),
                kinds: vec![KindTag(0x0F43)],
            }),
            ..AgentConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn prompted_use_answers_with_the_target() {
        let host = MockHost::new();
        host.push_feed("stale line");
        let executor = executor("Lumberjacking", CapabilityVia::Skill, true);

        let pending = executor.perform(&host, &tree()).await.unwrap();

        assert_eq!(pending.target, EntityId(7));
        assert_eq!(pending.deadline - pending.issued_at, Duration::from_secs(15));
        assert_eq!(host.clears(), 1);
        assert!(!host.search("stale line"));
        assert_eq!(
            host.resolved(),
            vec![(Actor::Skill("Lumberjacking".into()), TargetRef::Object(EntityId(7)))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silent_prompt_is_a_prompt_timeout() {
        let host = MockHost::new().silent();
        let executor = executor("Animal Taming", CapabilityVia::Skill, true);

        let error = executor.perform(&host, &tree()).await.unwrap_err();

        assert!(matches!(
            error,
            AgentError::TargetPromptTimeout { target: EntityId(7), .. }
        ));
        assert!(host.resolved().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_tool_fails_before_touching_the_feed() {
        let host = MockHost::new();
        let executor = executor("chop", CapabilityVia::EquippedTool, true);

        let error = executor.perform(&host, &tree()).await.unwrap_err();

        assert_eq!(
            error,
            AgentError::ToolExhausted {
                tool: "hatchet".into()
            }
        );
        assert_eq!(host.clears(), 0);
        assert!(host.used().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unprompted_target_item_is_used_directly() {
        let host = MockHost::new();
        let executor = executor("pick", CapabilityVia::TargetItem, false);

        executor.perform(&host, &tree()).await.unwrap();

        let used = host.used();
        assert_eq!(used.len(), 1);
        assert!(matches!(&used[0], (Actor::Item(item), None) if item.id == EntityId(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn unprompted_skill_names_its_target() {
        let host = MockHost::new();
        let executor = executor("attack", CapabilityVia::Skill, false);

        executor.perform(&host, &tree()).await.unwrap();

        assert_eq!(
            host.used(),
            vec![(Actor::Skill("attack".into()), Some(TargetRef::Object(EntityId(7))))]
        );
    }
}
