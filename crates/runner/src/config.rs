//! Runner configuration read from the environment.
use std::env;
use std::path::PathBuf;

/// Settings for one `field-agent` run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Bundled profile name or path to a `.ron` profile.
    pub profile: String,
    /// Bundled scenario name or path to a `.ron` scenario.
    /// `None` picks the scenario the profile was written for.
    pub scenario: Option<String>,
    /// Directory whose `profiles/` subdirectory shadows bundled profiles.
    pub data_dir: Option<PathBuf>,
    /// `None` runs until the agent terminates.
    pub max_ticks: Option<u64>,
    pub session_id: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            profile: "lumberjack".to_string(),
            scenario: None,
            data_dir: None,
            max_ticks: Some(10_000),
            session_id: None,
            log_dir: None,
        }
    }
}

impl RunnerConfig {
    /// Construct runner configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FIELD_AGENT_PROFILE` - profile name or path (default: lumberjack)
    /// - `FIELD_AGENT_SCENARIO` - scenario name or path (default: matches the profile)
    /// - `FIELD_AGENT_DATA_DIR` - directory with a `profiles/` override folder
    /// - `FIELD_AGENT_MAX_TICKS` - tick budget, `0` for unlimited (default: 10000)
    /// - `FIELD_AGENT_SESSION` - log session name (default: timestamp)
    /// - `FIELD_AGENT_LOG_DIR` - log root (default: platform cache dir)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(profile) = read("FIELD_AGENT_PROFILE") {
            config.profile = profile;
        }
        config.scenario = read("FIELD_AGENT_SCENARIO");
        config.data_dir = read("FIELD_AGENT_DATA_DIR").map(PathBuf::from);
        if let Some(ticks) = read("FIELD_AGENT_MAX_TICKS").and_then(|v| parse::<u64>(&v)) {
            config.max_ticks = (ticks > 0).then_some(ticks);
        }
        config.session_id = read("FIELD_AGENT_SESSION");
        config.log_dir = read("FIELD_AGENT_LOG_DIR").map(PathBuf::from);

        config
    }

    /// Scenario to load: the explicit one, else the one paired with the profile.
    pub fn scenario_reference(&self) -> &str {
        if let Some(scenario) = &self.scenario {
            return scenario;
        }
        match self.profile.as_str() {
            "tamer" => "ranch",
            "cotton_picker" => "cotton_field",
            "ore_smelter" => "mine",
            "carpenter" => "workshop",
            "corpse_looter" => "graveyard",
            "blacksmith" | "smelter" => "smithy",
            "auto_bandage" => "infirmary",
            _ => "lumberjack",
        }
    }
}

fn parse<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> RunnerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunnerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let config = config(&[]);
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.scenario_reference(), "lumberjack");
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("FIELD_AGENT_PROFILE", "tamer"),
            ("FIELD_AGENT_SCENARIO", "/tmp/pen.ron"),
            ("FIELD_AGENT_DATA_DIR", "/srv/agent"),
            ("FIELD_AGENT_MAX_TICKS", "250"),
            ("FIELD_AGENT_SESSION", "night-shift"),
            ("FIELD_AGENT_LOG_DIR", "/var/log/agent"),
        ]);
        assert_eq!(config.profile, "tamer");
        assert_eq!(config.scenario_reference(), "/tmp/pen.ron");
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/agent")));
        assert_eq!(config.max_ticks, Some(250));
        assert_eq!(config.session_id.as_deref(), Some("night-shift"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/agent")));
    }

    #[test]
    fn zero_ticks_means_unlimited() {
        assert_eq!(config(&[("FIELD_AGENT_MAX_TICKS", "0")]).max_ticks, None);
    }

    #[test]
    fn unparsable_or_blank_values_keep_defaults() {
        let config = config(&[
            ("FIELD_AGENT_MAX_TICKS", "lots"),
            ("FIELD_AGENT_PROFILE", "  "),
        ]);
        assert_eq!(config.max_ticks, Some(10_000));
        assert_eq!(config.profile, "lumberjack");
    }

    #[test]
    fn scenario_follows_the_profile() {
        let scenario = |profile: &str| {
            config(&[("FIELD_AGENT_PROFILE", profile)])
                .scenario_reference()
                .to_string()
        };
        assert_eq!(scenario("carpenter"), "workshop");
        assert_eq!(scenario("corpse_looter"), "graveyard");
        assert_eq!(scenario("smelter"), "smithy");
        assert_eq!(scenario("auto_bandage"), "infirmary");
        assert_eq!(scenario("chop_and_drop"), "lumberjack");
    }
}
