//! Content factory resolving profile names.

use std::path::{Path, PathBuf};

use agent_core::AgentConfig;
use tracing::debug;

use crate::bundled::{BUNDLED_PROFILES, bundled_profile};
use crate::loaders::{LoadResult, ProfileLoader};

/// Loads profiles from a data directory, falling back to the bundled set.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// └── profiles/
///     ├── lumberjack.ron
///     └── my_tamer.ron
/// ```
pub struct ContentFactory {
    data_dir: Option<PathBuf>,
}

impl ContentFactory {
    /// Creates a factory that looks in `data_dir/profiles` before the bundled set.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
        }
    }

    /// Creates a factory that only knows the bundled profiles.
    pub fn bundled() -> Self {
        Self { data_dir: None }
    }

    fn profile_path(&self, name: &str) -> Option<PathBuf> {
        let dir = self.data_dir.as_ref()?;
        let path = dir.join("profiles").join(format!("{name}.ron"));
        path.exists().then_some(path)
    }

    /// Resolves `reference` to a profile.
    ///
    /// A reference ending in `.ron` is read as a file path. Anything else is a
    /// profile name, looked up on disk first and then among the bundled ones.
    pub fn load_profile(&self, reference: &str) -> LoadResult<AgentConfig> {
        if reference.ends_with(".ron") {
            return ProfileLoader::load(Path::new(reference));
        }
        if let Some(path) = self.profile_path(reference) {
            debug!(target: "content::factory", path = %path.display(), "profile from data dir");
            return ProfileLoader::load(&path);
        }
        match bundled_profile(reference) {
            Some(source) => ProfileLoader::parse(source),
            None => Err(anyhow::anyhow!(
                "Unknown profile `{}`; bundled profiles are: {}",
                reference,
                self.bundled_names().join(", ")
            )),
        }
    }

    pub fn bundled_names(&self) -> Vec<&'static str> {
        BUNDLED_PROFILES.iter().map(|(name, _)| *name).collect()
    }
}
