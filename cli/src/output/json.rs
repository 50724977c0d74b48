//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed JSON document
//! on stdout: a report, a listing, or an error object.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{AuditReport, RunSummary, Scenario, ScenarioReport};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

#[derive(Serialize)]
struct RunDocument<'a> {
    passed: bool,
    summary: RunSummary,
    scenarios: &'a [ScenarioReport],
}

/// Format the reports of a `run` invocation.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_run(reports: &[ScenarioReport]) -> Result<String> {
    let summary = RunSummary::from_reports(reports);
    let doc = RunDocument {
        passed: summary.failed == 0,
        summary,
        scenarios: reports,
    };
    serde_json::to_string_pretty(&doc).context("JSON serialization failed")
}

#[derive(Serialize)]
struct ScenarioEntry<'a> {
    name: &'a str,
    description: &'a str,
    password: Option<String>,
    checks: Vec<String>,
}

/// Format the scenario catalog for `list`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_catalog(scenarios: &[Scenario]) -> Result<String> {
    let entries: Vec<ScenarioEntry<'_>> = scenarios
        .iter()
        .map(|s| ScenarioEntry {
            name: &s.name,
            description: &s.description,
            password: s.password.as_ref().map(crate::domain::PasswordSource::describe),
            checks: s.checks(),
        })
        .collect();
    serde_json::to_string_pretty(&serde_json::json!({ "scenarios": entries }))
        .context("JSON serialization failed")
}

/// Format an audit report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_audit(report: &AuditReport) -> Result<String> {
    let obj = serde_json::json!({
        "passed": report.passed(),
        "checks": report.checks,
        "violations": report.violations,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
