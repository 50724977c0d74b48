//! Static audits: plan without applying, then check the plan renderings and
//! the project files.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{ProgressReporter, ProjectFiles, ProvisioningTool};
use crate::application::services::provisioning::ProvisioningDriver;
use crate::domain::audit::{
    AuditCheck, check_module_pins, check_readme_section, check_sensitive_attributes,
    check_subnet_ranges,
};
use crate::domain::config::AuditSettings;
use crate::domain::tool_output::combined_output;
use crate::domain::{AuditReport, ScenarioConfig};

/// Saved plan file name inside the scratch directory.
pub const PLAN_FILE: &str = "plan.tfplan";

/// Module manifest written by `init`, relative to the working directory.
pub const MODULES_MANIFEST: &str = ".terraform/modules/modules.json";

/// Run every audit against the working directory of `config`.
///
/// Nothing is applied, so nothing is destroyed.
///
/// # Errors
///
/// Returns an error if init, plan, or show fail, or if the project files
/// cannot be read. Audit violations are not errors; they are in the report.
pub async fn run_audit(
    tool: &impl ProvisioningTool,
    files: &impl ProjectFiles,
    reporter: &impl ProgressReporter,
    config: &ScenarioConfig,
    settings: &AuditSettings,
) -> Result<AuditReport> {
    let driver = ProvisioningDriver::new(tool, config);

    reporter.step("init");
    driver.init().await.context("audit init")?;

    let scratch = tempfile::tempdir().context("creating plan directory")?;
    let plan_path = scratch.path().join(PLAN_FILE);
    reporter.step("plan");
    driver.plan(Some(&plan_path)).await.context("audit plan")?;

    let plan_text = show(tool, config, &plan_path, false).await?;
    let plan_json: serde_json::Value = serde_json::from_str(&show(tool, config, &plan_path, true).await?)
        .context("parsing JSON plan")?;

    let mut report = AuditReport::default();
    report.record(
        AuditCheck::SensitiveAttributes,
        check_sensitive_attributes(&plan_text, &settings.sensitive_attributes),
    );
    report.record(
        AuditCheck::SubnetRange,
        check_subnet_ranges(&plan_json, &settings.subnet_resource_prefix, &settings.network_range),
    );

    let manifest = files
        .read_to_string(Path::new(MODULES_MANIFEST))
        .context("reading module manifest")?;
    report.record(
        AuditCheck::ModulePins,
        check_module_pins(manifest.as_deref(), &settings.module_pins),
    );

    let readme = read_readme(files)?;
    report.record(
        AuditCheck::ReadmeSection,
        check_readme_section(readme.as_deref(), &settings.readme_section),
    );

    for check in &report.checks {
        if report.violations_for(*check).next().is_none() {
            reporter.success(&check.to_string());
        } else {
            reporter.warn(&check.to_string());
        }
    }
    Ok(report)
}

async fn show(
    tool: &impl ProvisioningTool,
    config: &ScenarioConfig,
    plan: &Path,
    json: bool,
) -> Result<String> {
    let out = tool
        .show(config, plan, json)
        .await
        .context("running show")?;
    if !out.status.success() {
        anyhow::bail!(
            "show failed: {}",
            config.mask(&combined_output(&out.stdout, &out.stderr))
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Read `readme.md`, matching the file name case-insensitively.
fn read_readme(files: &impl ProjectFiles) -> Result<Option<String>> {
    let entries = files.list_root().context("listing working directory")?;
    let Some(name) = entries.iter().find(|e| e.eq_ignore_ascii_case("readme.md")) else {
        return Ok(None);
    };
    files
        .read_to_string(Path::new(name))
        .with_context(|| format!("reading {name}"))
}
