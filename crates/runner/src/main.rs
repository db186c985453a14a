//! `field-agent` entry point.
//!
//! # Architecture
//!
//! The binary is a thin composition root:
//!
//! 1. [`RunnerConfig`] is read from the environment (after `.env`).
//! 2. Logging is installed to stderr and a per-session file.
//! 3. The profile is resolved through [`ContentFactory`] (data dir, then bundled).
//! 4. The scenario is loaded from a `.ron` path or the bundled set and turned
//!    into a [`SimWorld`], which serves as the agent's host.
//! 5. [`AgentStateMachine`] runs until it terminates or the tick budget is spent.
mod config;
mod logging;

use std::path::Path;
use std::sync::Arc;

use agent_content::ContentFactory;
use agent_core::AgentStateMachine;
use agent_sim::{BUNDLED_SCENARIOS, Scenario, ScenarioLoader, SimWorld, bundled_scenario};
use anyhow::{Context, Result};

use config::RunnerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = RunnerConfig::from_env();
    logging::setup_logging(config.log_dir.as_deref(), config.session_id.as_deref())?;

    let factory = match &config.data_dir {
        Some(dir) => ContentFactory::new(dir),
        None => ContentFactory::bundled(),
    };
    let profile = factory.load_profile(&config.profile)?;
    let scenario = load_scenario(config.scenario_reference())?;

    tracing::info!(
        profile = %profile.name,
        scenario = %scenario.name,
        max_ticks = ?config.max_ticks,
        "Starting field agent"
    );

    let world = SimWorld::new(scenario).context("Scenario is inconsistent")?;
    let mut machine = AgentStateMachine::start(profile, Arc::new(world))
        .await
        .context("Agent refused to start")?;
    let report = machine.run(config.max_ticks).await;

    match report.termination() {
        Some(reason) => tracing::info!(reason = reason.label(), "Agent terminated: {}", report),
        None => tracing::warn!("Tick budget spent before the agent finished: {}", report),
    }

    Ok(())
}

fn load_scenario(reference: &str) -> Result<Scenario> {
    if reference.ends_with(".ron") {
        return ScenarioLoader::load(Path::new(reference));
    }
    let source = bundled_scenario(reference).with_context(|| {
        let names: Vec<&str> = BUNDLED_SCENARIOS.iter().map(|(name, _)| *name).collect();
        format!(
            "Unknown scenario `{}`; bundled scenarios are: {}",
            reference,
            names.join(", ")
        )
    })?;
    ScenarioLoader::parse(source)
}
