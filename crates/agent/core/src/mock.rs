//! Mock host for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::env::{Actor, Companions, EventFeed, Interaction, ItemMover, Navigator, PromptHandle, TargetRef, WorldView};
use crate::state::{
    ContainerScope, Entity, EntityId, ItemRef, KindTag, NearbyFilter, Position, ResourceMeter,
    SelfStatus,
};

#[derive(Default)]
struct MockState {
    status: SelfStatus,
    weights: HashMap<KindTag, u32>,
    items: Vec<ItemRef>,
    nearby: Vec<Entity>,
    feed: Vec<String>,
    clears: u32,
    silent: bool,
    refuse_moves: bool,
    travels: Vec<Position>,
    used: Vec<(Actor, Option<TargetRef>)>,
    resolved: Vec<(Actor, TargetRef)>,
    prompts: HashMap<u64, Actor>,
    next_prompt: u64,
    refine: Option<(KindTag, KindTag)>,
}

impl MockState {
    fn weight(&self) -> u32 {
        self.items
            .iter()
            .filter(|i| matches!(i.container, ContainerScope::Backpack | ContainerScope::Equipped))
            .map(|i| i.amount * self.weights.get(&i.kind).copied().unwrap_or(1))
            .sum()
    }

    fn next_item_id(&self) -> EntityId {
        EntityId(self.items.iter().map(|i| i.id.0).max().unwrap_or(0x4000_0000) + 1)
    }
}

/// In-memory host that records every call the agent makes.
///
/// Weight is derived from backpack and equipped stacks (one stone per unit unless
/// overridden). Prompts appear instantly unless the host is silent.
#[derive(Clone)]
pub struct MockHost {
    state: Arc<Mutex<MockState>>,
}

impl MockHost {
    pub fn new() -> Self {
        let status = SelfStatus {
            health: ResourceMeter::new(100, 100),
            weight: ResourceMeter::new(0, 400),
            ..SelfStatus::default()
        };
        let mut state = MockState {
            status,
            next_prompt: 1,
            ..MockState::default()
        };
        state.status.resources.mana = ResourceMeter::new(50, 50);
        state.status.resources.proficiency = 50.0;
        state.status.resources.proficiency_cap = 100.0;
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_status(self, edit: impl FnOnce(&mut SelfStatus)) -> Self {
        self.set_status(edit);
        self
    }

    pub fn with_item(self, id: u32, kind: KindTag, amount: u32, container: ContainerScope) -> Self {
        self.state.lock().unwrap().items.push(ItemRef {
            id: EntityId(id),
            kind,
            amount,
            container,
        });
        self
    }

    pub fn with_weight(self, kind: KindTag, stones: u32) -> Self {
        self.state.lock().unwrap().weights.insert(kind, stones);
        self
    }

    pub fn with_entity(self, entity: Entity) -> Self {
        self.state.lock().unwrap().nearby.push(entity);
        self
    }

    /// Resolving a prompt on a backpack stack of `raw` turns it into `refined`.
    pub fn with_refine(self, raw: KindTag, refined: KindTag) -> Self {
        self.state.lock().unwrap().refine = Some((raw, refined));
        self
    }

    /// Prompts never appear.
    pub fn silent(self) -> Self {
        self.state.lock().unwrap().silent = true;
        self
    }

    pub fn refusing_moves(self) -> Self {
        self.state.lock().unwrap().refuse_moves = true;
        self
    }

    pub fn set_status(&self, edit: impl FnOnce(&mut SelfStatus)) {
        edit(&mut self.state.lock().unwrap().status);
    }

    pub fn push_feed(&self, line: &str) {
        self.state.lock().unwrap().feed.push(line.to_string());
    }

    pub fn count(&self, kind: KindTag, scope: ContainerScope) -> u32 {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|i| i.kind == kind && i.container == scope)
            .map(|i| i.amount)
            .sum()
    }

    pub fn travels(&self) -> Vec<Position> {
        self.state.lock().unwrap().travels.clone()
    }

    pub fn used(&self) -> Vec<(Actor, Option<TargetRef>)> {
        self.state.lock().unwrap().used.clone()
    }

    pub fn resolved(&self) -> Vec<(Actor, TargetRef)> {
        self.state.lock().unwrap().resolved.clone()
    }

    pub fn clears(&self) -> u32 {
        self.state.lock().unwrap().clears
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorldView for MockHost {
    async fn snapshot_self(&self) -> SelfStatus {
        let state = self.state.lock().unwrap();
        let mut status = state.status;
        status.weight.current = state.weight();
        status
    }

    async fn snapshot_nearby(&self, filter: &NearbyFilter) -> Vec<Entity> {
        let state = self.state.lock().unwrap();
        state
            .nearby
            .iter()
            .filter(|e| filter.accepts(e, state.status.position))
            .cloned()
            .collect()
    }

    async fn inventory_find(&self, kind: KindTag, scope: ContainerScope) -> Option<ItemRef> {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.kind == kind && i.container == scope)
            .copied()
    }

    async fn inventory_count(&self, kind: KindTag, scope: ContainerScope) -> u32 {
        self.count(kind, scope)
    }
}

#[async_trait]
impl ItemMover for MockHost {
    async fn move_item(&self, item: &ItemRef, destination: ContainerScope, quantity: u32) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.refuse_moves {
            return false;
        }
        let next_id = state.next_item_id();
        let Some(stored) = state.items.iter_mut().find(|i| i.id == item.id) else {
            return false;
        };
        if quantity == 0 || quantity >= stored.amount {
            stored.container = destination;
        } else {
            stored.amount -= quantity;
            let split = ItemRef {
                id: next_id,
                kind: stored.kind,
                amount: quantity,
                container: destination,
            };
            state.items.push(split);
        }
        true
    }
}

#[async_trait]
impl Interaction for MockHost {
    async fn use_capability(
        &self,
        actor: &Actor,
        target: Option<&TargetRef>,
    ) -> Option<PromptHandle> {
        let mut state = self.state.lock().unwrap();
        state.used.push((actor.clone(), target.copied()));
        if target.is_some() {
            return None;
        }
        let handle = state.next_prompt;
        state.next_prompt += 1;
        state.prompts.insert(handle, actor.clone());
        Some(PromptHandle(handle))
    }

    async fn wait_for_prompt(&self, handle: PromptHandle, timeout: Duration) -> bool {
        let (silent, known) = {
            let state = self.state.lock().unwrap();
            (state.silent, state.prompts.contains_key(&handle.0))
        };
        if silent {
            sleep(timeout).await;
            return false;
        }
        known
    }

    async fn resolve_prompt(&self, handle: PromptHandle, target: &TargetRef) {
        let mut state = self.state.lock().unwrap();
        let Some(actor) = state.prompts.remove(&handle.0) else {
            return;
        };
        state.resolved.push((actor, *target));

        if let (Some((raw, refined)), TargetRef::Object(id)) = (state.refine, target)
            && let Some(stack) = state
                .items
                .iter_mut()
                .find(|i| i.id == *id && i.kind == raw && i.container == ContainerScope::Backpack)
        {
            stack.kind = refined;
        }
    }
}

#[async_trait]
impl Navigator for MockHost {
    async fn travel_to(&self, destination: Position, _timeout: Duration) -> bool {
        let mut state = self.state.lock().unwrap();
        state.travels.push(destination);
        state.status.position = destination;
        true
    }
}

impl EventFeed for MockHost {
    fn search(&self, pattern: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .feed
            .iter()
            .any(|line| line.contains(pattern))
    }

    fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.feed.clear();
        state.clears += 1;
    }
}

#[async_trait]
impl Companions for MockHost {
    async fn rename_entity(&self, _id: EntityId, _name: &str) -> bool {
        true
    }

    async fn release_entity(&self, _id: EntityId) -> bool {
        true
    }
}
