//! Capabilities the host environment supplies to the agent.
//!
//! The core never talks to a client, socket or pathfinder directly; it consumes
//! these traits. Every call answers "as of now": an entity seen on one tick may be
//! gone on the next, and callers treat that as a normal disappearance.
//!
//! [`Host`] aggregates all of them so the state machine can hold one handle.

use std::time::Duration;

use async_trait::async_trait;

use crate::state::{ContainerScope, Entity, EntityId, ItemRef, KindTag, NearbyFilter, Position, SelfStatus};

/// Thing performing an interaction: a named skill/spell or an item being used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    Skill(String),
    Item(ItemRef),
}

/// Answer given to a target prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetRef {
    Object(EntityId),
    Location(Position),
    Myself,
}

/// Opaque handle for an in-flight interaction awaiting its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PromptHandle(pub u64);

/// Read-only queries against the live world.
#[async_trait]
pub trait WorldView: Send + Sync {
    async fn snapshot_self(&self) -> SelfStatus;

    async fn snapshot_nearby(&self, filter: &NearbyFilter) -> Vec<Entity>;

    /// First stack of `kind` in `scope`.
    async fn inventory_find(&self, kind: KindTag, scope: ContainerScope) -> Option<ItemRef>;

    /// Total amount of `kind` across every stack in `scope`.
    async fn inventory_count(&self, kind: KindTag, scope: ContainerScope) -> u32;
}

#[async_trait]
pub trait ItemMover: Send + Sync {
    /// Moves `quantity` of `item` into `destination`; `0` moves the whole stack.
    async fn move_item(&self, item: &ItemRef, destination: ContainerScope, quantity: u32) -> bool;
}

#[async_trait]
pub trait Interaction: Send + Sync {
    /// Uses a skill or item. Returns a prompt handle when the host is going to ask
    /// for a target, `None` when the use completed (or was refused) immediately.
    async fn use_capability(&self, actor: &Actor, target: Option<&TargetRef>)
    -> Option<PromptHandle>;

    /// Waits at most `timeout` for the prompt behind `handle` to appear.
    async fn wait_for_prompt(&self, handle: PromptHandle, timeout: Duration) -> bool;

    async fn resolve_prompt(&self, handle: PromptHandle, target: &TargetRef);
}

#[async_trait]
pub trait Navigator: Send + Sync {
    /// Moves next to `destination`. `false` covers every way of not arriving.
    async fn travel_to(&self, destination: Position, timeout: Duration) -> bool;
}

/// Text notifications the server emits after actions, delivered with latency.
pub trait EventFeed: Send + Sync {
    /// Single non-blocking check for `pattern` anywhere in the retained feed.
    fn search(&self, pattern: &str) -> bool;

    /// Forgets everything received so far.
    fn clear(&self);
}

/// Operations on entities the agent controls (tamed pets).
#[async_trait]
pub trait Companions: Send + Sync {
    async fn rename_entity(&self, id: EntityId, name: &str) -> bool;

    async fn release_entity(&self, id: EntityId) -> bool;
}

/// Every capability the agent needs, as one object.
pub trait Host: WorldView + ItemMover + Interaction + Navigator + EventFeed + Companions {}

impl<T> Host for T where T: WorldView + ItemMover + Interaction + Navigator + EventFeed + Companions {}

/// First stack of any of `kinds` in `scope`, in preference order.
pub async fn find_any<H: WorldView + ?Sized>(
    host: &H,
    kinds: &[KindTag],
    scope: ContainerScope,
) -> Option<ItemRef> {
    for kind in kinds {
        if let Some(item) = host.inventory_find(*kind, scope).await {
            return Some(item);
        }
    }
    None
}
