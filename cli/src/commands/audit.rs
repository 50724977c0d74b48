//! Audit command: static checks on the plan and project files, no apply.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::audit::run_audit;
use crate::commands::{ToolArgs, lookup_env};
use crate::domain::{PasswordSource, build_scenario_config};
use crate::infra::project_files::LocalProjectFiles;
use crate::infra::terraform::TerraformCli;
use crate::output::{HumanRenderer, TerminalReporter, json};

/// Arguments for the audit command.
#[derive(Args, Debug, Default)]
pub struct AuditArgs {
    /// Environment variable holding the password to plan with
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    #[command(flatten)]
    pub tool: ToolArgs,
}

/// Run the static audits. Returns whether no violation was found.
///
/// # Errors
///
/// Returns an error if the tool cannot init, plan, or show, or if the
/// password variable is unset.
pub async fn run(app: &AppContext, args: &AuditArgs) -> Result<bool> {
    let mut settings = app.settings.clone();
    args.tool.apply_to(&mut settings);

    let password = args.password_env.clone().map(PasswordSource::Env);
    let config = build_scenario_config(
        &settings,
        "audit",
        password.as_ref(),
        &args.tool.variables(),
        lookup_env,
    )?;

    let tool = TerraformCli::with_binary(settings.tool.clone());
    let files = LocalProjectFiles::new(config.working_dir.clone());
    let reporter = if app.is_json() {
        TerminalReporter::silent(&app.output)
    } else {
        TerminalReporter::new(&app.output)
    };

    let report = run_audit(&tool, &files, &reporter, &config, &settings.audit).await?;

    if app.is_json() {
        println!("{}", json::format_audit(&report)?);
    } else {
        HumanRenderer::new(&app.output).render_audit(&report);
    }
    Ok(report.passed())
}
