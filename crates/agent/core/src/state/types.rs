use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Opaque, stable handle for anything the world can name: creatures, resource
/// nodes, containers and individual item stacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Graphic/body identifier shared by every instance of one kind of thing
/// (all oak trees, all log stacks, all timber wolves).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KindTag(pub u16);

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Discrete world position in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Range in tiles as the server measures it: the larger of the two planar
    /// offsets. Height is ignored.
    pub fn distance_to(self, other: Position) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Integer meter with a current and maximum value (health, weight, mana).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceMeter {
    pub current: u32,
    pub maximum: u32,
}

impl ResourceMeter {
    pub const fn new(current: u32, maximum: u32) -> Self {
        Self { current, maximum }
    }

    /// Current value as a percentage of the maximum, in `[0, 100]`.
    ///
    /// A zero maximum reads as full.
    pub fn percent(&self) -> u32 {
        if self.maximum == 0 {
            return 100;
        }
        ((self.current.min(self.maximum) as u64 * 100) / self.maximum as u64) as u32
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.maximum
    }

    pub fn deficit(&self) -> u32 {
        self.maximum.saturating_sub(self.current)
    }
}

bitflags! {
    /// Classification tags the world attaches to an entity.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct EntityTags: u16 {
        const HOSTILE = 1 << 0;
        const TAMEABLE = 1 << 1;
        const IGNORABLE = 1 << 2;
        const RESOURCE = 1 << 3;
        const CORPSE = 1 << 4;
        const STATION = 1 << 5;
        /// Hostile that is currently engaging the agent.
        const ATTACKING = 1 << 6;
    }
}

/// Read-only view of one world entity as of the snapshot that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: KindTag,
    #[serde(default)]
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub health: ResourceMeter,
    #[serde(default)]
    pub tags: EntityTags,
}

impl Entity {
    pub fn new(id: EntityId, kind: KindTag, position: Position) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            position,
            health: ResourceMeter::default(),
            tags: EntityTags::empty(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_health(mut self, current: u32, maximum: u32) -> Self {
        self.health = ResourceMeter::new(current, maximum);
        self
    }

    pub fn with_tags(mut self, tags: EntityTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn is_hostile(&self) -> bool {
        self.tags.contains(EntityTags::HOSTILE)
    }
}

/// Where an item lives, or where it should be moved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerScope {
    Backpack,
    /// Held in hand / worn.
    Equipped,
    /// Lying on the ground within reach.
    Ground,
    Container(EntityId),
}

impl fmt::Display for ContainerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerScope::Backpack => write!(f, "backpack"),
            ContainerScope::Equipped => write!(f, "equipped"),
            ContainerScope::Ground => write!(f, "ground"),
            ContainerScope::Container(id) => write!(f, "container {id}"),
        }
    }
}

/// Handle to one item stack found in some container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: EntityId,
    pub kind: KindTag,
    pub amount: u32,
    pub container: ContainerScope,
}

/// Secondary resources reported alongside health and weight.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub mana: ResourceMeter,
    pub followers: ResourceMeter,
    /// Skill level for the profile's trained skill.
    pub proficiency: f32,
    pub proficiency_cap: f32,
}

/// Point-in-time status of the agent's own character.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct SelfStatus {
    pub health: ResourceMeter,
    pub weight: ResourceMeter,
    pub resources: Resources,
    pub position: Position,
}

/// Query passed to `snapshot_nearby`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct NearbyFilter {
    /// Accepted kinds; empty accepts any kind.
    pub kinds: Vec<KindTag>,
    /// Every listed tag must be present.
    pub required_tags: EntityTags,
    /// Maximum range in tiles from the agent.
    pub range: u32,
}

impl NearbyFilter {
    pub fn within(range: u32) -> Self {
        Self {
            range,
            ..Self::default()
        }
    }

    pub fn with_kinds(mut self, kinds: Vec<KindTag>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_tags(mut self, tags: EntityTags) -> Self {
        self.required_tags = tags;
        self
    }

    /// Applies the filter to one entity as seen from `origin`.
    pub fn accepts(&self, entity: &Entity, origin: Position) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&entity.kind))
            && entity.tags.contains(self.required_tags)
            && origin.distance_to(entity.position) <= self.range
    }
}
