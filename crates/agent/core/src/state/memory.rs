//! Session memory of targets the agent must not pick again.

use std::collections::{HashSet, VecDeque};

use super::EntityId;

/// Bounded recency set of exhausted or ignored target ids.
///
/// Ids are evicted oldest-first once `capacity` is exceeded, after which they
/// become selectable again. Marking an id that is already present does not
/// refresh its age.
#[derive(Clone, Debug)]
pub struct TaskMemory {
    order: VecDeque<EntityId>,
    members: HashSet<EntityId>,
    capacity: usize,
}

impl TaskMemory {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Marks `id` as exhausted and returns the id evicted to make room, if any.
    pub fn remember(&mut self, id: EntityId) -> Option<EntityId> {
        if !self.members.insert(id) {
            return None;
        }
        self.order.push_back(id);

        if self.order.len() > self.capacity {
            let evicted = self.order.pop_front()?;
            self.members.remove(&evicted);
            return Some(evicted);
        }
        None
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remembered ids, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }
}

impl Default for TaskMemory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
