//! Data model shared by every agent component.
mod agent;
mod memory;
mod types;

pub use agent::{AgentState, PendingAction};
pub use memory::TaskMemory;
pub use types::{
    ContainerScope, Entity, EntityId, EntityTags, ItemRef, KindTag, NearbyFilter, Position,
    ResourceMeter, Resources, SelfStatus,
};
