//! Domain types and builders for harness configuration.
//!
//! No I/O, no async, no filesystem access. Environment
//! lookups are injected so the builders stay testable.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use infraguard_common::Cidr;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::retry::{
    DEFAULT_MAX_RETRIES, DEFAULT_TIME_BETWEEN_RETRIES, RetryPolicy, RetryTable,
};

// ── Settings schema ──────────────────────────────────────────────────────────

/// Top-level settings stored in `infraguard.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Provisioning tool binary (`terraform`, `tofu`, or a path).
    pub tool: String,
    /// Directory holding the declarative resource definitions.
    pub working_dir: PathBuf,
    /// Pass `-no-color` to every tool invocation.
    pub no_color: bool,
    /// Retries after the first attempt for retryable failures.
    pub max_retries: u32,
    /// Pause between retries, in seconds.
    pub time_between_retries_secs: u64,
    /// Timeout for short tool calls (`output`, `show`), in seconds.
    pub command_timeout_secs: u64,
    /// Upper bound on a single DNS lookup, in seconds.
    pub dns_timeout_secs: u64,
    /// Optional bound on a whole scenario, in seconds.
    pub scenario_timeout_secs: Option<u64>,
    /// Input variable that receives the scenario password.
    pub password_variable: String,
    /// Extra input variables passed to every scenario.
    pub variables: BTreeMap<String, String>,
    /// Additional retryable error rules, evaluated after the defaults.
    pub retryable_errors: Vec<RetryableErrorSetting>,
    /// Drop the built-in retryable error table.
    pub disable_default_retryable_errors: bool,
    /// Static audit options.
    pub audit: AuditSettings,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            tool: "terraform".to_string(),
            working_dir: PathBuf::from("."),
            no_color: true,
            max_retries: DEFAULT_MAX_RETRIES,
            time_between_retries_secs: DEFAULT_TIME_BETWEEN_RETRIES.as_secs(),
            command_timeout_secs: 30,
            dns_timeout_secs: 10,
            scenario_timeout_secs: None,
            password_variable: "db_pwd".to_string(),
            variables: BTreeMap::new(),
            retryable_errors: Vec::new(),
            disable_default_retryable_errors: false,
            audit: AuditSettings::default(),
        }
    }
}

/// A single `(pattern, reason)` retry rule as written in the settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryableErrorSetting {
    pub pattern: String,
    pub reason: String,
}

/// Static audit options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Planned attributes that must be rendered as `(sensitive value)`.
    pub sensitive_attributes: Vec<String>,
    /// Resource address fragment selecting the subnets to check.
    pub subnet_resource_prefix: String,
    /// Range every selected subnet must fall into.
    pub network_range: Cidr,
    /// Module key → pinned version expected in `.terraform/modules/modules.json`.
    pub module_pins: BTreeMap<String, String>,
    /// Heading the readme must contain (`## <section>`).
    pub readme_section: String,
}

impl Default for AuditSettings {
    #[allow(clippy::expect_used)] // Literal is a compile-time constant
    fn default() -> Self {
        Self {
            sensitive_attributes: vec!["password".to_string()],
            subnet_resource_prefix: "module.vpc.aws_subnet.".to_string(),
            network_range: "10.0.0.0/16".parse().expect("valid default range"),
            module_pins: BTreeMap::from([("vpc".to_string(), "5.1.2".to_string())]),
            readme_section: "Acknowledgment".to_string(),
        }
    }
}

/// Values taken from `INFRAGUARD_*` environment variables.
///
/// Every field is optional; set fields replace the file values.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub tool: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub no_color: Option<bool>,
    pub max_retries: Option<u32>,
    pub time_between_retries_secs: Option<u64>,
    pub command_timeout_secs: Option<u64>,
    pub dns_timeout_secs: Option<u64>,
    pub scenario_timeout_secs: Option<u64>,
}

impl HarnessSettings {
    /// Overlay the set fields of `overrides`.
    pub fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if let Some(tool) = overrides.tool {
            self.tool = tool;
        }
        if let Some(dir) = overrides.working_dir {
            self.working_dir = dir;
        }
        if let Some(no_color) = overrides.no_color {
            self.no_color = no_color;
        }
        if let Some(n) = overrides.max_retries {
            self.max_retries = n;
        }
        if let Some(secs) = overrides.time_between_retries_secs {
            self.time_between_retries_secs = secs;
        }
        if let Some(secs) = overrides.command_timeout_secs {
            self.command_timeout_secs = secs;
        }
        if let Some(secs) = overrides.dns_timeout_secs {
            self.dns_timeout_secs = secs;
        }
        if overrides.scenario_timeout_secs.is_some() {
            self.scenario_timeout_secs = overrides.scenario_timeout_secs;
        }
    }

    /// Build the retry table: defaults (unless disabled) then configured rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryPattern`] for an invalid pattern.
    pub fn retry_table(&self) -> Result<RetryTable, ConfigError> {
        let mut table = if self.disable_default_retryable_errors {
            RetryTable::empty()
        } else {
            RetryTable::defaults()
        };
        for rule in &self.retryable_errors {
            table.push(&rule.pattern, rule.reason.clone())?;
        }
        Ok(table)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            time_between_retries: Duration::from_secs(self.time_between_retries_secs),
        }
    }

    #[must_use]
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

// ── Password source ──────────────────────────────────────────────────────────

/// Where a scenario takes its password from.
///
/// Written in YAML as `{ literal: VALUE }` or `{ env: VAR }`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(try_from = "PasswordSourceRepr")]
pub enum PasswordSource {
    /// A literal value written in the scenario definition.
    Literal(String),
    /// The value of an environment variable, read when the config is built.
    Env(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PasswordSourceRepr {
    literal: Option<String>,
    env: Option<String>,
}

impl TryFrom<PasswordSourceRepr> for PasswordSource {
    type Error = String;

    fn try_from(repr: PasswordSourceRepr) -> Result<Self, Self::Error> {
        match (repr.literal, repr.env) {
            (Some(value), None) => Ok(Self::Literal(value)),
            (None, Some(var)) => Ok(Self::Env(var)),
            _ => Err("password must set exactly one of `literal` or `env`".to_string()),
        }
    }
}

impl PasswordSource {
    /// Resolve the password using `lookup` for environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if an `Env` source is unset.
    pub fn resolve(
        &self,
        scenario: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Env(var) => lookup(var).ok_or_else(|| ConfigError::MissingEnv {
                var: var.clone(),
                scenario: scenario.to_string(),
            }),
        }
    }

    /// Short human description that never contains the secret.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Literal(_) => "literal".to_string(),
            Self::Env(var) => format!("env {var}"),
        }
    }
}

// ── Scenario config ──────────────────────────────────────────────────────────

/// Everything one scenario run needs. Immutable once built.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub working_dir: PathBuf,
    pub variables: BTreeMap<String, String>,
    pub no_color: bool,
    pub retryable_errors: RetryTable,
    pub retry: RetryPolicy,
    pub command_timeout: Duration,
    pub timeout: Option<Duration>,
    /// Variable names whose values are masked in logs and reports.
    pub sensitive_variables: BTreeSet<String>,
}

impl ScenarioConfig {
    /// A config with no variables, no retries and defaults elsewhere.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            variables: BTreeMap::new(),
            no_color: true,
            retryable_errors: RetryTable::empty(),
            retry: RetryPolicy {
                max_retries: 0,
                time_between_retries: Duration::ZERO,
            },
            command_timeout: Duration::from_secs(30),
            timeout: None,
            sensitive_variables: BTreeSet::new(),
        }
    }

    /// Replace every sensitive variable value in `text` with `***`.
    #[must_use]
    pub fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for name in &self.sensitive_variables {
            if let Some(value) = self.variables.get(name) {
                if !value.is_empty() {
                    masked = masked.replace(value.as_str(), "***");
                }
            }
        }
        masked
    }
}

/// Build the config of one scenario from the harness settings.
///
/// The password (if any) is bound to `settings.password_variable` and marked
/// sensitive. `extra_variables` (scenario variables, then `--var` overrides)
/// are layered last, so they win over both settings variables and the
/// password. An overridden password is never resolved but stays sensitive.
///
/// # Errors
///
/// Returns an error if the password source cannot be resolved or a retry
/// pattern is invalid.
pub fn build_scenario_config(
    settings: &HarnessSettings,
    scenario: &str,
    password: Option<&PasswordSource>,
    extra_variables: &BTreeMap<String, String>,
    lookup_env: impl Fn(&str) -> Option<String>,
) -> Result<ScenarioConfig, ConfigError> {
    let mut variables = settings.variables.clone();
    let mut sensitive_variables = BTreeSet::new();
    if let Some(source) = password {
        let name = &settings.password_variable;
        if !extra_variables.contains_key(name) {
            variables.insert(name.clone(), source.resolve(scenario, lookup_env)?);
        }
        sensitive_variables.insert(name.clone());
    }
    variables.extend(extra_variables.iter().map(|(k, v)| (k.clone(), v.clone())));

    Ok(ScenarioConfig {
        working_dir: settings.working_dir.clone(),
        variables,
        no_color: settings.no_color,
        retryable_errors: settings.retry_table()?,
        retry: settings.retry_policy(),
        command_timeout: settings.command_timeout(),
        timeout: settings.scenario_timeout_secs.map(Duration::from_secs),
        sensitive_variables,
    })
}

// ── Unit tests ───────────────────────────────────────────────────────────────
