//! Per-scenario run report.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use infraguard_common::{ChangeSummary, Finding};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::domain::error::{HarnessError, StageFailure};
use crate::domain::scenario::ScenarioState;

/// Everything observed while running one scenario.
///
/// A scenario passes iff `failures` is empty. Teardown failures are appended
/// after body failures, never in place of them.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    /// Final state; `torn_down` once destroy has run.
    pub state: ScenarioState,
    /// Furthest state reached before teardown.
    pub reached: ScenarioState,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Changes made by the apply, when it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSummary>,
    pub outputs: BTreeMap<String, String>,
    pub findings: Vec<Finding>,
    pub failures: Vec<StageFailure>,
    pub passed: bool,
}

impl ScenarioReport {
    #[must_use]
    pub fn new(name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            state: ScenarioState::NotStarted,
            reached: ScenarioState::NotStarted,
            started_at,
            elapsed: Duration::ZERO,
            changes: None,
            outputs: BTreeMap::new(),
            findings: Vec::new(),
            failures: Vec::new(),
            passed: true,
        }
    }

    /// Append a failure and mark the report failed.
    pub fn fail(&mut self, failure: StageFailure) {
        self.failures.push(failure);
        self.passed = false;
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// The first failure, which is the cause of the run failing.
    #[must_use]
    pub fn primary_failure(&self) -> Option<&StageFailure> {
        self.failures.first()
    }
}

/// Aggregate of a whole `run` invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_reports(reports: &[ScenarioReport]) -> Self {
        let passed = reports.iter().filter(|r| r.passed()).count();
        Self {
            total: reports.len(),
            passed,
            failed: reports.len() - passed,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's serialize_with signature
fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl Serialize for StageFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let violation = match &self.error {
            HarnessError::SecurityViolation { host, address } => Some((host, address)),
            _ => None,
        };
        let fields = if violation.is_some() { 5 } else { 3 };
        let mut state = serializer.serialize_struct("StageFailure", fields)?;
        state.serialize_field("stage", &self.stage)?;
        state.serialize_field("kind", self.error.kind())?;
        state.serialize_field("message", &self.error.to_string())?;
        if let Some((host, address)) = violation {
            state.serialize_field("host", host)?;
            state.serialize_field("address", address)?;
        }
        state.end()
    }
}
