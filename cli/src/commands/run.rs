//! Run command: provision, verify, and tear down scenarios.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::scenario_runner::run_all;
use crate::commands::{ToolArgs, lookup_env};
use crate::domain::scenario::{builtin_scenarios, merge_catalog, select_scenarios};
use crate::domain::{ConfigError, RunSummary};
use crate::infra::config::load_scenario_file;
use crate::infra::resolver::TokioResolver;
use crate::infra::terraform::TerraformCli;
use crate::output::{HumanRenderer, TerminalReporter, json};

/// Arguments for the run command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Scenarios to run (default: all)
    #[arg(value_name = "SCENARIO")]
    pub scenarios: Vec<String>,

    /// Load additional scenarios from a YAML file
    #[arg(long, value_name = "FILE")]
    pub scenarios_file: Option<PathBuf>,

    /// Run scenarios with distinct working directories concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Per-scenario timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub tool: ToolArgs,
}

/// Run the selected scenarios. Returns whether all of them passed.
///
/// # Errors
///
/// Returns an error if the scenario selection or a scenario config cannot be
/// built. Nothing is provisioned in that case.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<bool> {
    let mut settings = app.settings.clone();
    args.tool.apply_to(&mut settings);
    if args.timeout.is_some() {
        settings.scenario_timeout_secs = args.timeout;
    }

    let extra = match &args.scenarios_file {
        Some(path) => load_scenario_file(path)?,
        None => Vec::new(),
    };
    let catalog = merge_catalog(builtin_scenarios(), extra)?;
    let selected = select_scenarios(&catalog, &args.scenarios)?;

    let overrides = args.tool.variables();
    let jobs = selected
        .into_iter()
        .map(|scenario| Ok((scenario, scenario.config(&settings, &overrides, lookup_env)?)))
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let tool = TerraformCli::with_binary(settings.tool.clone());
    let resolver = TokioResolver::new(settings.dns_timeout());
    let reporter = if app.is_json() {
        TerminalReporter::silent(&app.output)
    } else {
        TerminalReporter::new(&app.output)
    };

    let reports = run_all(&tool, &resolver, &reporter, &jobs, args.parallel).await;
    let summary = RunSummary::from_reports(&reports);

    if app.is_json() {
        println!("{}", json::format_run(&reports)?);
    } else {
        let renderer = HumanRenderer::new(&app.output);
        for report in &reports {
            renderer.render_report(report);
        }
        renderer.render_summary(&summary);
    }
    Ok(summary.failed == 0)
}
