//! Scenario definitions, the built-in catalog, and the per-scenario state machine.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::config::{HarnessSettings, PasswordSource, ScenarioConfig, build_scenario_config};
use crate::domain::error::ConfigError;

// ── Definitions ───────────────────────────────────────────────────────────────

/// How the scenario provisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// A single apply.
    #[default]
    Apply,
    /// Apply, then require a second run against the converged state to plan
    /// zero changes.
    ApplyIdempotent,
}

/// An output that must contain a substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputExpectation {
    pub name: String,
    pub contains: String,
}

/// One validation scenario.
///
/// Variants differ only in the supplied variables, the apply mode, the
/// output checks, and the outputs whose endpoints must resolve privately.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Working directory relative to the configured one; defaults to it.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub password: Option<PasswordSource>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub mode: ApplyMode,
    #[serde(default)]
    pub expect_outputs: Vec<OutputExpectation>,
    /// Output names holding hostnames that must resolve only to private addresses.
    #[serde(default)]
    pub private_endpoints: Vec<String>,
}

impl Scenario {
    fn new(name: &str, description: &str, password: PasswordSource) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            working_dir: None,
            password: Some(password),
            variables: BTreeMap::new(),
            mode: ApplyMode::Apply,
            expect_outputs: Vec::new(),
            private_endpoints: Vec::new(),
        }
    }

    /// Build the run config: settings variables, then scenario variables,
    /// then `overrides`; the working directory is resolved against the
    /// configured one.
    ///
    /// # Errors
    ///
    /// Returns an error if the password source cannot be resolved or a retry
    /// pattern is invalid.
    pub fn config(
        &self,
        settings: &HarnessSettings,
        overrides: &BTreeMap<String, String>,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Result<ScenarioConfig, ConfigError> {
        let mut variables = self.variables.clone();
        variables.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        let mut config = build_scenario_config(
            settings,
            &self.name,
            self.password.as_ref(),
            &variables,
            lookup_env,
        )?;
        if let Some(dir) = &self.working_dir {
            config.working_dir = settings.working_dir.join(dir);
        }
        Ok(config)
    }

    /// Short list of what the scenario asserts, for listings.
    #[must_use]
    pub fn checks(&self) -> Vec<String> {
        let mut checks = Vec::new();
        if self.mode == ApplyMode::ApplyIdempotent {
            checks.push("idempotency".to_string());
        }
        for expectation in &self.expect_outputs {
            checks.push(format!("output {} ⊇ '{}'", expectation.name, expectation.contains));
        }
        for endpoint in &self.private_endpoints {
            checks.push(format!("private endpoint {endpoint}"));
        }
        checks
    }
}

/// Top-level shape of a scenario file.
#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    pub scenarios: Vec<Scenario>,
}

/// The scenarios shipped with the harness.
#[must_use]
pub fn builtin_scenarios() -> Vec<Scenario> {
    let mut endpoint = Scenario::new(
        "rds-endpoint",
        "Database endpoint is exposed in the expected region",
        PasswordSource::Literal("test1234".to_string()),
    );
    endpoint.expect_outputs.push(OutputExpectation {
        name: "endpoint".to_string(),
        contains: ".eu-west-3.rds.amazonaws.com".to_string(),
    });

    let mut idempotent = Scenario::new(
        "idempotent-apply",
        "Re-applying the unchanged declaration is a no-op",
        PasswordSource::Literal("password".to_string()),
    );
    idempotent.mode = ApplyMode::ApplyIdempotent;

    let mut idempotent_env = Scenario::new(
        "idempotent-apply-env",
        "Idempotency with the password taken from DB_PWD",
        PasswordSource::Env("DB_PWD".to_string()),
    );
    idempotent_env.mode = ApplyMode::ApplyIdempotent;

    let mut private = Scenario::new(
        "rds-private-address",
        "Database address resolves only to private addresses",
        PasswordSource::Env("DB_PWD".to_string()),
    );
    private
        .private_endpoints
        .push("rds_instance_address".to_string());

    vec![endpoint, idempotent, idempotent_env, private]
}

/// Merge file scenarios after the built-in ones, rejecting duplicate names.
///
/// # Errors
///
/// Returns [`ConfigError::DuplicateScenario`] if a name appears twice.
pub fn merge_catalog(
    builtin: Vec<Scenario>,
    extra: Vec<Scenario>,
) -> Result<Vec<Scenario>, ConfigError> {
    let mut seen = HashSet::new();
    let mut all = Vec::with_capacity(builtin.len() + extra.len());
    for scenario in builtin.into_iter().chain(extra) {
        if !seen.insert(scenario.name.clone()) {
            return Err(ConfigError::DuplicateScenario(scenario.name));
        }
        all.push(scenario);
    }
    Ok(all)
}

/// Pick scenarios by name, keeping the requested order. Empty `names` selects all.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownScenario`] for the first unknown name.
pub fn select_scenarios<'a>(
    catalog: &'a [Scenario],
    names: &[String],
) -> Result<Vec<&'a Scenario>, ConfigError> {
    if names.is_empty() {
        return Ok(catalog.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            catalog
                .iter()
                .find(|s| &s.name == name)
                .ok_or_else(|| ConfigError::UnknownScenario {
                    name: name.clone(),
                    available: catalog
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
        })
        .collect()
}

// ── State machine ─────────────────────────────────────────────────────────────

/// Lifecycle state of one scenario run.
///
/// `Errored` absorbs every later success event; only teardown leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    NotStarted,
    Initialized,
    Applied,
    Verified,
    Errored,
    TornDown,
}

impl ScenarioState {
    /// Init succeeded.
    #[must_use]
    pub fn initialized(self) -> Self {
        self.advance(Self::NotStarted, Self::Initialized)
    }

    /// Apply (or apply with idempotency check) succeeded.
    #[must_use]
    pub fn applied(self) -> Self {
        self.advance(Self::Initialized, Self::Applied)
    }

    /// Every assertion passed.
    #[must_use]
    pub fn verified(self) -> Self {
        self.advance(Self::Applied, Self::Verified)
    }

    /// Any operation failed.
    #[must_use]
    pub fn errored(self) -> Self {
        match self {
            Self::TornDown => Self::TornDown,
            _ => Self::Errored,
        }
    }

    /// Destroy completed (successfully or with a reported failure).
    #[must_use]
    pub fn torn_down(self) -> Self {
        Self::TornDown
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::TornDown
    }

    fn advance(self, from: Self, to: Self) -> Self {
        if self == from {
            to
        } else {
            // Out-of-order success events cannot happen in a sequential run;
            // treat them as a failure rather than skipping a stage.
            self.errored()
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Initialized => "initialized",
            Self::Applied => "applied",
            Self::Verified => "verified",
            Self::Errored => "errored",
            Self::TornDown => "torn down",
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
