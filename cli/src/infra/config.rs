//! Settings and scenario file loading.
//!
//! Layering: `infraguard.yaml` (optional), then `INFRAGUARD_*` environment
//! variables. CLI flags are applied last by the commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::{HarnessSettings, SettingsOverrides};
use crate::domain::scenario::{Scenario, ScenarioFile};

/// Settings file looked up in the current directory when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = "infraguard.yaml";

/// Prefix of the environment variables that override settings.
pub const ENV_PREFIX: &str = "INFRAGUARD_";

/// Load settings from `explicit` (which must exist) or from
/// `./infraguard.yaml` (if present), then overlay the environment.
///
/// # Errors
///
/// Returns an error if a settings file cannot be read or parsed, or if an
/// `INFRAGUARD_*` variable has an invalid value.
pub fn load_settings(explicit: Option<&Path>) -> Result<HarnessSettings> {
    let mut settings = match explicit {
        Some(path) => read_settings(path)?,
        None => {
            let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if default.exists() {
                read_settings(&default)?
            } else {
                HarnessSettings::default()
            }
        }
    };
    settings.apply_overrides(env_overrides()?);
    Ok(settings)
}

/// Read `INFRAGUARD_*` overrides from the process environment.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed into its field type.
pub fn env_overrides() -> Result<SettingsOverrides> {
    envy::prefixed(ENV_PREFIX)
        .from_env::<SettingsOverrides>()
        .context("invalid INFRAGUARD_* environment variable")
}

fn read_settings(path: &Path) -> Result<HarnessSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
}

/// Load additional scenarios from a YAML file with a top-level `scenarios:` list.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_scenario_file(path: &Path) -> Result<Vec<Scenario>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let file: ScenarioFile = serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    Ok(file.scenarios)
}
