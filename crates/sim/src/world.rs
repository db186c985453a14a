use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agent_core::{
    Actor, Companions, ContainerScope, Entity, EntityId, EntityTags, EventFeed, Interaction,
    ItemMover, ItemRef, KindTag, Navigator, NearbyFilter, Position, PromptHandle, ResourceMeter,
    Resources, SelfStatus, TargetRef, WorldView,
};
use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use tracing::trace;

use crate::error::SimError;
use crate::scenario::{Behavior, ConversionRule, EntitySpec, ItemSpec, Scenario, SimSettings};

struct Body {
    health: ResourceMeter,
    mana: ResourceMeter,
    followers: ResourceMeter,
    max_weight: u32,
    proficiency: f32,
    proficiency_cap: f32,
    gain: f32,
    position: Position,
}

struct SimEntity {
    entity: Entity,
    behavior: Behavior,
    uses: u32,
}

struct SimItem {
    kind: KindTag,
    amount: u32,
    container: ContainerScope,
    uses: Option<u32>,
}

struct FeedLine {
    visible_at: Instant,
    text: String,
}

struct Prompt {
    actor: Actor,
    ready_at: Instant,
}

struct SimState {
    body: Body,
    entities: BTreeMap<EntityId, SimEntity>,
    items: BTreeMap<EntityId, SimItem>,
    weights: BTreeMap<KindTag, u32>,
    conversions: Vec<ConversionRule>,
    settings: SimSettings,
    feed: Vec<FeedLine>,
    prompts: HashMap<u64, Prompt>,
    next_prompt: u64,
    next_item: u32,
}

/// Shared handle to a simulated world. Clones observe the same state.
#[derive(Clone)]
pub struct SimWorld {
    inner: Arc<Mutex<SimState>>,
}

impl SimWorld {
    /// Builds a world from a scenario, checking ids and container references.
    pub fn new(scenario: Scenario) -> Result<Self, SimError> {
        let mut seen = HashSet::new();
        let mut entities = BTreeMap::new();
        for spec in scenario.entities {
            if !seen.insert(spec.id) {
                return Err(SimError::DuplicateId(spec.id));
            }
            entities.insert(spec.id, SimEntity::from_spec(spec));
        }

        let mut items = BTreeMap::new();
        for spec in &scenario.items {
            if !seen.insert(spec.id) {
                return Err(SimError::DuplicateId(spec.id));
            }
            if spec.amount == 0 {
                return Err(SimError::EmptyStack {
                    item: spec.id,
                    kind: spec.kind,
                });
            }
        }
        for spec in scenario.items {
            if let ContainerScope::Container(container) = spec.container
                && !seen.contains(&container)
            {
                return Err(SimError::UnknownContainer {
                    item: spec.id,
                    container,
                });
            }
            items.insert(spec.id, SimItem::from_spec(&spec));
        }

        let next_item = seen.iter().map(|id| id.0).max().unwrap_or(0).max(0x4000_0000) + 1;
        let agent = scenario.agent;
        let state = SimState {
            body: Body {
                health: ResourceMeter::new(agent.health.0, agent.health.1),
                mana: ResourceMeter::new(agent.mana.0, agent.mana.1),
                followers: ResourceMeter::new(agent.followers.0, agent.followers.1),
                max_weight: agent.max_weight,
                proficiency: agent.proficiency,
                proficiency_cap: agent.proficiency_cap,
                gain: agent.gain,
                position: agent.position,
            },
            entities,
            items,
            weights: scenario.weights,
            conversions: scenario.conversions,
            settings: scenario.settings,
            feed: Vec::new(),
            prompts: HashMap::new(),
            next_prompt: 1,
            next_item,
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(state)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------------
    // Direct manipulation, for scripted events and tests
    // ------------------------------------------------------------------------

    pub fn damage_agent(&self, amount: u32) {
        let mut state = self.lock();
        state.body.health.current = state.body.health.current.saturating_sub(amount);
    }

    pub fn set_health(&self, current: u32) {
        let mut state = self.lock();
        state.body.health.current = current.min(state.body.health.maximum);
    }

    pub fn set_proficiency(&self, value: f32) {
        self.lock().body.proficiency = value;
    }

    pub fn set_responsive(&self, responsive: bool) {
        self.lock().settings.responsive = responsive;
    }

    pub fn block(&self, destination: Position) {
        self.lock().settings.unreachable.push(destination);
    }

    pub fn set_position(&self, position: Position) {
        self.lock().body.position = position;
    }

    /// Appends a feed line that becomes visible after the usual latency.
    pub fn push_event(&self, text: impl Into<String>) {
        self.lock().push(text);
    }

    pub fn add_entity(&self, spec: EntitySpec) {
        self.lock().entities.insert(spec.id, SimEntity::from_spec(spec));
    }

    pub fn remove_entity(&self, id: EntityId) {
        self.lock().entities.remove(&id);
    }

    pub fn add_item(&self, spec: ItemSpec) {
        self.lock().items.insert(spec.id, SimItem::from_spec(&spec));
    }

    /// Tags `id` as the hostile currently attacking the agent.
    pub fn mark_attacking(&self, id: EntityId) {
        if let Some(entry) = self.lock().entities.get_mut(&id) {
            entry.entity.tags |= EntityTags::HOSTILE | EntityTags::ATTACKING;
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.lock().entities.get(&id).map(|e| e.entity.clone())
    }

    pub fn count(&self, kind: KindTag, scope: ContainerScope) -> u32 {
        self.lock().count(kind, scope)
    }

    pub fn position(&self) -> Position {
        self.lock().body.position
    }

    pub fn weight(&self) -> u32 {
        self.lock().weight()
    }

    pub fn health(&self) -> ResourceMeter {
        self.lock().body.health
    }

    pub fn proficiency(&self) -> f32 {
        self.lock().body.proficiency
    }
}

impl SimEntity {
    fn from_spec(spec: EntitySpec) -> Self {
        Self {
            entity: Entity::new(spec.id, spec.kind, spec.position)
                .with_name(spec.name)
                .with_health(spec.health.0, spec.health.1)
                .with_tags(spec.tags),
            behavior: spec.behavior,
            uses: 0,
        }
    }
}

impl SimItem {
    fn from_spec(spec: &ItemSpec) -> Self {
        Self {
            kind: spec.kind,
            amount: spec.amount,
            container: spec.container,
            uses: spec.uses,
        }
    }
}

// ============================================================================
// World rules
// ============================================================================

impl SimState {
    fn push(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        trace!(target: "sim::feed", %text, "feed line queued");
        self.feed.push(FeedLine {
            visible_at: Instant::now() + Duration::from_millis(self.settings.feed_latency_ms),
            text,
        });
    }

    fn unit_weight(&self, kind: KindTag) -> u32 {
        self.weights.get(&kind).copied().unwrap_or(1)
    }

    fn weight(&self) -> u32 {
        self.items
            .values()
            .filter(|i| matches!(i.container, ContainerScope::Backpack | ContainerScope::Equipped))
            .map(|i| i.amount * self.unit_weight(i.kind))
            .sum()
    }

    fn count(&self, kind: KindTag, scope: ContainerScope) -> u32 {
        self.items
            .values()
            .filter(|i| i.kind == kind && i.container == scope)
            .map(|i| i.amount)
            .sum()
    }

    fn find(&self, kind: KindTag, scope: ContainerScope) -> Option<ItemRef> {
        self.items
            .iter()
            .find(|(_, i)| i.kind == kind && i.container == scope)
            .map(|(id, i)| ItemRef {
                id: *id,
                kind: i.kind,
                amount: i.amount,
                container: i.container,
            })
    }

    fn new_item_id(&mut self) -> EntityId {
        let id = EntityId(self.next_item);
        self.next_item += 1;
        id
    }

    fn add_to_backpack(&mut self, kind: KindTag, amount: u32) {
        let existing = self
            .items
            .values_mut()
            .find(|i| i.kind == kind && i.container == ContainerScope::Backpack);
        match existing {
            Some(stack) => stack.amount += amount,
            None => {
                let id = self.new_item_id();
                self.items.insert(
                    id,
                    SimItem {
                        kind,
                        amount,
                        container: ContainerScope::Backpack,
                        uses: None,
                    },
                );
            }
        }
    }

    /// Removes `amount` of `kind` from the backpack, or nothing if there is not enough.
    fn take_from_backpack(&mut self, kind: KindTag, amount: u32) -> bool {
        if self.count(kind, ContainerScope::Backpack) < amount {
            return false;
        }
        let mut left = amount;
        let ids: Vec<EntityId> = self
            .items
            .iter()
            .filter(|(_, i)| i.kind == kind && i.container == ContainerScope::Backpack)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            if left == 0 {
                break;
            }
            if let Some(stack) = self.items.get_mut(&id) {
                let taken = stack.amount.min(left);
                stack.amount -= taken;
                left -= taken;
                if stack.amount == 0 {
                    self.items.remove(&id);
                }
            }
        }
        true
    }

    fn in_reach(&self, container: EntityId) -> bool {
        match self.entities.get(&container) {
            Some(entry) => {
                self.body.position.distance_to(entry.entity.position) <= self.settings.reach
            }
            None => self.items.contains_key(&container),
        }
    }

    fn container_exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id) || self.items.contains_key(&id)
    }

    fn gain(&mut self) {
        let body = &mut self.body;
        body.proficiency = (body.proficiency + body.gain).min(body.proficiency_cap);
    }

    /// One use of an item with limited durability.
    fn wear(&mut self, actor: &Actor) {
        let Actor::Item(item) = actor else {
            return;
        };
        let broke = match self.items.get_mut(&item.id) {
            Some(SimItem {
                uses: Some(uses), ..
            }) => {
                *uses = uses.saturating_sub(1);
                *uses == 0
            }
            _ => false,
        };
        if broke {
            self.items.remove(&item.id);
            self.push("You have worn out your tool!");
        }
    }

    fn apply(&mut self, actor: &Actor, target: &TargetRef) {
        match target {
            TargetRef::Myself => self.heal(actor),
            TargetRef::Location(_) => {}
            TargetRef::Object(id) => {
                if self.entities.contains_key(id) {
                    self.apply_to_entity(actor, *id);
                } else if let Some(raw) = self.items.get(id).map(|i| i.kind) {
                    self.convert(actor, raw, None);
                }
            }
        }
    }

    fn apply_to_entity(&mut self, actor: &Actor, id: EntityId) {
        let hostile = self
            .entities
            .get(&id)
            .is_some_and(|e| e.entity.tags.contains(EntityTags::HOSTILE));

        match actor {
            Actor::Skill(skill) if hostile && skill == "attack" => self.strike(id),
            Actor::Skill(_) if hostile => {
                if let Some(entry) = self.entities.get_mut(&id) {
                    entry.entity.tags.remove(EntityTags::HOSTILE | EntityTags::ATTACKING);
                }
                self.push("You play your hypnotic music, calming the creature.");
            }
            Actor::Item(item)
                if self
                    .conversions
                    .iter()
                    .any(|r| r.raw == item.kind && r.station == Some(id)) =>
            {
                self.convert(actor, item.kind, Some(id));
            }
            _ => self.interact(actor, id),
        }
    }

    fn strike(&mut self, id: EntityId) {
        let damage = self.settings.strike_damage;
        let slain = match self.entities.get_mut(&id) {
            Some(entry) => {
                let health = &mut entry.entity.health;
                health.current = health.current.saturating_sub(damage);
                health.current == 0
            }
            None => return,
        };
        if slain {
            self.entities.remove(&id);
            self.push("You have slain your opponent.");
        } else {
            self.push("You hit your opponent.");
        }
    }

    fn heal(&mut self, actor: &Actor) {
        match actor {
            Actor::Item(item) if item.kind == self.settings.bandage_kind => {
                let consumed = match self.items.get_mut(&item.id) {
                    Some(stack) if stack.amount > 0 => {
                        stack.amount -= 1;
                        if stack.amount == 0 {
                            self.items.remove(&item.id);
                        }
                        true
                    }
                    _ => false,
                };
                if consumed {
                    let heal = self.settings.bandage_heal;
                    let health = &mut self.body.health;
                    health.current = (health.current + heal).min(health.maximum);
                    self.push("You finish applying the bandages.");
                }
            }
            Actor::Skill(spell) => {
                let Some(rule) = self.settings.spells.get(spell).cloned() else {
                    return;
                };
                if self.body.mana.current < rule.mana {
                    self.push("Insufficient mana for this spell.");
                    return;
                }
                self.body.mana.current -= rule.mana;
                let health = &mut self.body.health;
                health.current = (health.current + rule.heal).min(health.maximum);
                self.push("You feel better.");
            }
            Actor::Item(_) => {}
        }
    }

    fn convert(&mut self, actor: &Actor, raw: KindTag, station: Option<EntityId>) {
        let Some(rule) = self
            .conversions
            .iter()
            .find(|r| r.raw == raw && r.station == station)
            .cloned()
        else {
            return;
        };
        if let Some(station) = station
            && !self.in_reach(station)
        {
            self.push("That is too far away.");
            return;
        }
        let amount = self.count(raw, ContainerScope::Backpack);
        if amount == 0 || !self.take_from_backpack(raw, amount) {
            self.push("There is not enough material to make anything.");
            return;
        }
        self.add_to_backpack(rule.refined, amount * rule.ratio);
        self.push(rule.text);
        if station.is_none() {
            self.wear(actor);
        }
    }

    fn interact(&mut self, actor: &Actor, id: EntityId) {
        let Some(entry) = self.entities.get_mut(&id) else {
            return;
        };
        entry.uses += 1;
        let uses = entry.uses;

        match &mut entry.behavior {
            Behavior::Inert => {}
            Behavior::Harvest {
                yield_kind,
                per_use,
                remaining,
                success_text,
                depleted_text,
                fail_every,
                fail_text,
            } => {
                if *remaining == 0 {
                    let text = depleted_text.clone();
                    self.push(text);
                } else if fail_every.is_some_and(|n| n > 0 && uses % n == 0) {
                    let text = fail_text.clone();
                    self.push(text);
                } else {
                    *remaining -= 1;
                    let (kind, amount, text) = (*yield_kind, *per_use, success_text.clone());
                    self.add_to_backpack(kind, amount);
                    self.push(text);
                    self.gain();
                    self.wear(actor);
                }
            }
            Behavior::Tame {
                resist,
                success_text,
                failure_text,
                tamed_text,
            } => {
                let tags = entry.entity.tags;
                if !tags.contains(EntityTags::TAMEABLE) {
                    let text = tamed_text.clone();
                    self.push(text);
                } else if uses <= *resist {
                    let text = failure_text.clone();
                    self.push(text);
                } else {
                    entry.entity.tags.remove(EntityTags::TAMEABLE | EntityTags::HOSTILE);
                    let text = success_text.clone();
                    self.body.followers.current += 1;
                    self.push(text);
                    self.gain();
                }
            }
            Behavior::Station {
                material,
                cost,
                product,
                success_text,
                shortage_text,
            } => {
                let (material, cost, product) = (*material, *cost, *product);
                let (success, shortage) = (success_text.clone(), shortage_text.clone());
                if self.take_from_backpack(material, cost) {
                    self.add_to_backpack(product, 1);
                    self.push(success);
                    self.gain();
                    self.wear(actor);
                } else {
                    self.push(shortage);
                }
            }
            Behavior::Container { open_text } => {
                let text = open_text.clone();
                self.push(text);
            }
        }
    }
}

// ============================================================================
// Host capabilities
// ============================================================================

#[async_trait]
impl WorldView for SimWorld {
    async fn snapshot_self(&self) -> SelfStatus {
        let state = self.lock();
        let body = &state.body;
        SelfStatus {
            health: body.health,
            weight: ResourceMeter::new(state.weight(), body.max_weight),
            resources: Resources {
                mana: body.mana,
                followers: body.followers,
                proficiency: body.proficiency,
                proficiency_cap: body.proficiency_cap,
            },
            position: body.position,
        }
    }

    async fn snapshot_nearby(&self, filter: &NearbyFilter) -> Vec<Entity> {
        let state = self.lock();
        let origin = state.body.position;
        state
            .entities
            .values()
            .filter(|e| filter.accepts(&e.entity, origin))
            .map(|e| e.entity.clone())
            .collect()
    }

    async fn inventory_find(&self, kind: KindTag, scope: ContainerScope) -> Option<ItemRef> {
        self.lock().find(kind, scope)
    }

    async fn inventory_count(&self, kind: KindTag, scope: ContainerScope) -> u32 {
        self.lock().count(kind, scope)
    }
}

#[async_trait]
impl ItemMover for SimWorld {
    async fn move_item(&self, item: &ItemRef, destination: ContainerScope, quantity: u32) -> bool {
        let mut state = self.lock();
        let Some(stored) = state.items.get(&item.id) else {
            return false;
        };
        let (source, amount, kind, uses) = (stored.container, stored.amount, stored.kind, stored.uses);
        if source != item.container {
            return false;
        }
        if let ContainerScope::Container(from) = source
            && !state.in_reach(from)
        {
            return false;
        }
        if let ContainerScope::Container(to) = destination
            && (!state.container_exists(to) || !state.in_reach(to))
        {
            return false;
        }

        if destination == ContainerScope::Equipped {
            for other in state.items.values_mut() {
                if other.container == ContainerScope::Equipped {
                    other.container = ContainerScope::Backpack;
                }
            }
        }

        if quantity == 0 || quantity >= amount {
            if let Some(stored) = state.items.get_mut(&item.id) {
                stored.container = destination;
            }
        } else {
            if let Some(stored) = state.items.get_mut(&item.id) {
                stored.amount -= quantity;
            }
            let id = state.new_item_id();
            state.items.insert(
                id,
                SimItem {
                    kind,
                    amount: quantity,
                    container: destination,
                    uses,
                },
            );
        }
        true
    }
}

#[async_trait]
impl Interaction for SimWorld {
    async fn use_capability(
        &self,
        actor: &Actor,
        target: Option<&TargetRef>,
    ) -> Option<PromptHandle> {
        let mut state = self.lock();
        if let Some(target) = target {
            state.apply(actor, target);
            return None;
        }
        if let Actor::Item(item) = actor
            && state.entities.contains_key(&item.id)
        {
            state.interact(actor, item.id);
            return None;
        }

        let handle = state.next_prompt;
        state.next_prompt += 1;
        let ready_at = Instant::now() + Duration::from_millis(state.settings.prompt_delay_ms);
        state.prompts.insert(
            handle,
            Prompt {
                actor: actor.clone(),
                ready_at,
            },
        );
        Some(PromptHandle(handle))
    }

    async fn wait_for_prompt(&self, handle: PromptHandle, timeout: Duration) -> bool {
        let wait = {
            let state = self.lock();
            match state.prompts.get(&handle.0) {
                Some(prompt) if state.settings.responsive => {
                    Some(prompt.ready_at.saturating_duration_since(Instant::now()))
                }
                Some(_) => None,
                None => return false,
            }
        };
        match wait {
            Some(delay) if delay <= timeout => {
                sleep(delay).await;
                true
            }
            _ => {
                sleep(timeout).await;
                false
            }
        }
    }

    async fn resolve_prompt(&self, handle: PromptHandle, target: &TargetRef) {
        let mut state = self.lock();
        if let Some(prompt) = state.prompts.remove(&handle.0) {
            state.apply(&prompt.actor, target);
        }
    }
}

#[async_trait]
impl Navigator for SimWorld {
    async fn travel_to(&self, destination: Position, timeout: Duration) -> bool {
        let (duration, reachable) = {
            let state = self.lock();
            let tiles = u64::from(state.body.position.distance_to(destination));
            (
                Duration::from_millis(tiles * state.settings.travel_ms_per_tile),
                !state.settings.unreachable.contains(&destination),
            )
        };
        if !reachable || duration > timeout {
            sleep(timeout).await;
            return false;
        }
        sleep(duration).await;
        self.lock().body.position = destination;
        true
    }
}

impl EventFeed for SimWorld {
    fn search(&self, pattern: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .feed
            .iter()
            .any(|line| line.visible_at <= now && line.text.contains(pattern))
    }

    fn clear(&self) {
        self.lock().feed.clear();
    }
}

#[async_trait]
impl Companions for SimWorld {
    async fn rename_entity(&self, id: EntityId, name: &str) -> bool {
        match self.lock().entities.get_mut(&id) {
            Some(entry) => {
                entry.entity.name = name.to_string();
                true
            }
            None => false,
        }
    }

    async fn release_entity(&self, id: EntityId) -> bool {
        let mut state = self.lock();
        if !state.entities.contains_key(&id) {
            return false;
        }
        let followers = &mut state.body.followers;
        followers.current = followers.current.saturating_sub(1);
        true
    }
}
