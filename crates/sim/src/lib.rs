//! Simulated world for running and testing field agents without a game client.
//!
//! [`SimWorld`] implements every capability trait from [`agent_core::env`] over
//! an in-memory model: entities with scripted behaviours, item stacks in
//! containers, a latency-delayed event feed, prompts that take time to appear,
//! and travel that costs time per tile. All timing uses `tokio::time`, so tests
//! run on a paused clock.
//!
//! Scenarios are authored as RON and loaded with [`ScenarioLoader`].

mod bundled;
mod error;
pub mod scenario;
mod world;

pub use bundled::{BUNDLED_SCENARIOS, bundled_scenario};
pub use error::SimError;
pub use scenario::{
    AgentSpec, Behavior, ConversionRule, EntitySpec, ItemSpec, Scenario, ScenarioLoader,
    SimSettings, SpellRule,
};
pub use world::SimWorld;
