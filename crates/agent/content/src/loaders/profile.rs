//! Agent profile loader.

use std::path::Path;

use agent_core::AgentConfig;
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

/// Loader for agent profiles from RON files.
pub struct ProfileLoader;

impl ProfileLoader {
    /// Load and validate a profile from a RON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the RON file containing an `AgentConfig`
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid RON, or describes a
    /// profile that [`AgentConfig::validate`] rejects.
    pub fn load(path: &Path) -> LoadResult<AgentConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid profile {}: {}", path.display(), e))
    }

    /// Parse and validate a profile from RON source.
    pub fn parse(content: &str) -> LoadResult<AgentConfig> {
        let config: AgentConfig = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse profile RON: {}", e))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Profile `{}` is invalid: {}", config.name, e))?;

        debug!(
            target: "content::profile",
            profile = %config.name,
            strategy = %config.selector.strategy,
            capability = %config.capability.name,
            "profile loaded"
        );
        Ok(config)
    }
}
