//! Infrastructure implementation of the `ProvisioningTool` port.
//!
//! `TerraformCli<R>` builds Terraform-compatible command lines (works for
//! `terraform` and `tofu`) and routes them through a `CommandRunner`.

use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, ProvisioningTool};
use crate::domain::ScenarioConfig;
use crate::infra::command_runner::TokioCommandRunner;

/// Adapter that runs the provisioning tool binary through a `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct TerraformCli<R: CommandRunner> {
    binary: String,
    runner: R,
}

impl<R: CommandRunner> TerraformCli<R> {
    pub fn new(binary: impl Into<String>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Lifecycle verbs run without a time bound.
    async fn run_unbounded(&self, verb: &str, config: &ScenarioConfig, args: Vec<String>) -> Result<Output> {
        self.log(config, &args);
        self.runner
            .run(&self.binary, &args, &config.working_dir)
            .await
            .with_context(|| format!("{} {verb}", self.binary))
    }

    /// Read-only verbs are bounded by the command timeout.
    async fn run_bounded(&self, verb: &str, config: &ScenarioConfig, args: Vec<String>) -> Result<Output> {
        self.log(config, &args);
        self.runner
            .run_with_timeout(&self.binary, &args, &config.working_dir, config.command_timeout)
            .await
            .with_context(|| format!("{} {verb}", self.binary))
    }

    fn log(&self, config: &ScenarioConfig, args: &[String]) {
        tracing::debug!(
            program = %self.binary,
            dir = %config.working_dir.display(),
            args = %config.mask(&args.join(" ")),
            "invoking provisioning tool"
        );
    }
}

impl TerraformCli<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self::new(binary, TokioCommandRunner)
    }
}

impl<R: CommandRunner> ProvisioningTool for TerraformCli<R> {
    async fn init(&self, config: &ScenarioConfig) -> Result<Output> {
        self.run_unbounded("init", config, init_args(config)).await
    }

    async fn apply(&self, config: &ScenarioConfig) -> Result<Output> {
        self.run_unbounded("apply", config, apply_args(config)).await
    }

    async fn plan(&self, config: &ScenarioConfig, out: Option<&Path>) -> Result<Output> {
        self.run_unbounded("plan", config, plan_args(config, out)).await
    }

    async fn destroy(&self, config: &ScenarioConfig) -> Result<Output> {
        self.run_unbounded("destroy", config, destroy_args(config)).await
    }

    async fn output(&self, config: &ScenarioConfig, name: &str) -> Result<Output> {
        self.run_bounded("output", config, output_args(name)).await
    }

    async fn show(&self, config: &ScenarioConfig, plan: &Path, json: bool) -> Result<Output> {
        self.run_bounded("show", config, show_args(plan, json)).await
    }
}

// ── Argument builders ─────────────────────────────────────────────────────────

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// `-no-color` when configured, then `-var NAME=VALUE` pairs sorted by name.
fn push_common(mut args: Vec<String>, config: &ScenarioConfig, with_vars: bool) -> Vec<String> {
    if config.no_color {
        args.push("-no-color".to_string());
    }
    if with_vars {
        // BTreeMap iteration is already sorted by name.
        for (name, value) in &config.variables {
            args.push("-var".to_string());
            args.push(format!("{name}={value}"));
        }
    }
    args
}

#[must_use]
pub fn init_args(config: &ScenarioConfig) -> Vec<String> {
    push_common(args(&["init", "-input=false", "-upgrade=false"]), config, false)
}

#[must_use]
pub fn apply_args(config: &ScenarioConfig) -> Vec<String> {
    push_common(args(&["apply", "-input=false", "-auto-approve"]), config, true)
}

#[must_use]
pub fn plan_args(config: &ScenarioConfig, out: Option<&Path>) -> Vec<String> {
    let mut base = args(&["plan", "-input=false", "-detailed-exitcode"]);
    if let Some(path) = out {
        base.push(format!("-out={}", path.display()));
    }
    push_common(base, config, true)
}

#[must_use]
pub fn destroy_args(config: &ScenarioConfig) -> Vec<String> {
    push_common(args(&["destroy", "-input=false", "-auto-approve"]), config, true)
}

#[must_use]
pub fn output_args(name: &str) -> Vec<String> {
    args(&["output", "-no-color", "-json", name])
}

#[must_use]
pub fn show_args(plan: &Path, json: bool) -> Vec<String> {
    let mut out = args(&["show", "-no-color"]);
    if json {
        out.push("-json".to_string());
    }
    out.push(plan.display().to_string());
    out
}
