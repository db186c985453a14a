//! Data-driven agent profiles.
//!
//! Every field agent is one [`AgentConfig`](agent_core::AgentConfig) authored as
//! RON. This crate ships the stock profiles (lumberjack, tamer, carpenter, ...)
//! compiled into the binary and provides loaders for profiles on disk:
//! - [`bundled`] lists the built-in profiles by name
//! - [`ProfileLoader`] parses and validates a single profile file
//! - [`ContentFactory`] resolves profile names against a data directory, falling
//!   back to the bundled set

pub mod bundled;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use bundled::{BUNDLED_PROFILES, bundled_profile};

#[cfg(feature = "loaders")]
pub use loaders::{ContentFactory, LoadResult, ProfileLoader};
