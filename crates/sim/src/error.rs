use agent_core::{EntityId, KindTag};
use thiserror::Error;

/// Problems found while building a world from a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("id {0} is used by more than one entity or item")]
    DuplicateId(EntityId),

    #[error("item {item} is stored in unknown container {container}")]
    UnknownContainer { item: EntityId, container: EntityId },

    #[error("item {item} of kind {kind} has zero amount")]
    EmptyStack { item: EntityId, kind: KindTag },
}
