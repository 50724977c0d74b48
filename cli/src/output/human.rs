//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{
    AuditReport, HarnessError, RunSummary, Scenario, ScenarioReport, StageFailure,
};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version.
    pub fn render_version(&self, version: &str) {
        println!("infraguard {version}");
    }

    /// Render the scenario catalog.
    pub fn render_catalog(&self, scenarios: &[Scenario]) {
        if scenarios.is_empty() {
            self.ctx.info("No scenarios defined.");
            return;
        }
        for scenario in scenarios {
            println!("{}", scenario.name.style(self.ctx.styles.bold));
            if !scenario.description.is_empty() {
                println!("    {}", scenario.description);
            }
            if let Some(password) = &scenario.password {
                self.ctx.kv("password:", &password.describe());
            }
            self.ctx.kv("mode:", mode_label(scenario));
            for check in scenario.checks() {
                self.ctx.kv("check:", &check);
            }
        }
    }

    /// Render one scenario report.
    ///
    /// Failures are always printed, even in quiet mode.
    pub fn render_report(&self, report: &ScenarioReport) {
        let elapsed = format!("{:.1}s", report.elapsed.as_secs_f64());
        if report.passed() {
            if !self.ctx.quiet {
                println!(
                    "{} {} {}",
                    "PASS".style(self.ctx.styles.success),
                    report.name,
                    elapsed.style(self.ctx.styles.dim)
                );
            }
        } else {
            println!(
                "{} {} {} {}",
                "FAIL".style(self.ctx.styles.error),
                report.name,
                format!("(reached {})", report.reached).style(self.ctx.styles.dim),
                elapsed.style(self.ctx.styles.dim)
            );
        }

        if let Some(changes) = report.changes {
            self.ctx.kv("changes:", &changes.to_string());
        }
        for (name, value) in &report.outputs {
            self.ctx.kv(&format!("output {name}:"), value);
        }
        for finding in &report.findings {
            let addresses: Vec<String> = finding
                .resolved_addresses
                .iter()
                .map(ToString::to_string)
                .collect();
            self.ctx.kv(
                &format!("{}:", finding.host),
                &format!("{} ({})", addresses.join(", "), finding.reason),
            );
        }
        for failure in &report.failures {
            self.render_failure(failure);
        }
    }

    fn render_failure(&self, failure: &StageFailure) {
        let stage = format!("[{}]", failure.stage);
        let kind = failure.error.kind();
        let head = match &failure.error {
            HarnessError::SecurityViolation { host, address } => {
                format!("{kind}: host {host} resolves to public address {address}")
            }
            other => format!("{kind}: {other}"),
        };
        self.ctx
            .failure(&format!("{} {head}", stage.style(self.ctx.styles.stage)));
    }

    /// Render the closing line of a run.
    pub fn render_summary(&self, summary: &RunSummary) {
        let line = format!(
            "{} scenario(s): {} passed, {} failed",
            summary.total, summary.passed, summary.failed
        );
        println!();
        if summary.failed == 0 {
            if !self.ctx.quiet {
                println!("{}", line.style(self.ctx.styles.success));
            }
        } else {
            println!("{}", line.style(self.ctx.styles.error));
        }
    }

    /// Render an audit report.
    pub fn render_audit(&self, report: &AuditReport) {
        for check in &report.checks {
            let violations: Vec<_> = report.violations_for(*check).collect();
            if violations.is_empty() {
                self.ctx.success(&check.to_string());
            } else {
                for violation in violations {
                    self.ctx.failure(&violation.to_string());
                }
            }
        }
        if report.passed() {
            self.ctx.header("Audit passed");
        } else {
            println!(
                "{}",
                format!("Audit failed: {} violation(s)", report.violations.len())
                    .style(self.ctx.styles.error)
            );
        }
    }
}

fn mode_label(scenario: &Scenario) -> &'static str {
    match scenario.mode {
        crate::domain::ApplyMode::Apply => "apply",
        crate::domain::ApplyMode::ApplyIdempotent => "apply + idempotency check",
    }
}
