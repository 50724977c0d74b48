//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`
//! beyond the address type carried by security violations.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use infraguard_common::ChangeSummary;
use serde::Serialize;
use thiserror::Error;

// ── Harness errors ────────────────────────────────────────────────────────────

/// Every failure a scenario can report.
///
/// `detail` fields carry the captured tool output (or the spawn error) so the
/// report shows what the provisioning tool actually said.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HarnessError {
    #[error("init failed: {detail}")]
    Init { detail: String },

    #[error("apply failed after {attempts} attempt(s) ({}): {detail}", retry_label(.retryable))]
    Apply {
        retryable: bool,
        attempts: u32,
        detail: String,
    },

    #[error("apply is not idempotent: second run plans {pending}")]
    Idempotency { pending: ChangeSummary },

    #[error("output '{name}' not found: {detail}")]
    OutputNotFound { name: String, detail: String },

    #[error("output '{name}' = '{actual}' does not contain '{expected}'")]
    OutputMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("could not resolve '{host}': {reason}")]
    Resolution { host: String, reason: String },

    #[error("'{host}' resolves to public address {address}")]
    SecurityViolation { host: String, address: IpAddr },

    #[error("destroy failed after {attempts} attempt(s): {detail}")]
    Destroy { attempts: u32, detail: String },

    #[error("scenario timed out after {}s", .limit.as_secs())]
    Timeout { limit: Duration },

    #[error("scenario aborted: {reason}")]
    Aborted { reason: String },
}

impl HarnessError {
    /// Stable machine-readable code used in JSON reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init_error",
            Self::Apply { .. } => "apply_error",
            Self::Idempotency { .. } => "idempotency_error",
            Self::OutputNotFound { .. } => "output_not_found",
            Self::OutputMismatch { .. } => "output_mismatch",
            Self::Resolution { .. } => "resolution_error",
            Self::SecurityViolation { .. } => "security_violation",
            Self::Destroy { .. } => "destroy_error",
            Self::Timeout { .. } => "timeout",
            Self::Aborted { .. } => "aborted",
        }
    }
}

fn retry_label(retryable: &bool) -> &'static str {
    if *retryable { "retryable" } else { "fatal" }
}

// ── Stage failures ────────────────────────────────────────────────────────────

/// Lifecycle stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Init,
    Apply,
    Verify,
    Destroy,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Apply => "apply",
            Self::Verify => "verify",
            Self::Destroy => "destroy",
        })
    }
}

/// An error paired with the stage that raised it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{stage}] {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: HarnessError,
}

impl StageFailure {
    #[must_use]
    pub fn new(stage: Stage, error: HarnessError) -> Self {
        Self { stage, error }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while building settings, scenarios, or scenario configs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {var} is not set (password source for scenario '{scenario}')")]
    MissingEnv { var: String, scenario: String },

    #[error("invalid retryable error pattern '{pattern}': {source}")]
    InvalidRetryPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown scenario: {name}\n\nAvailable scenarios: {available}")]
    UnknownScenario { name: String, available: String },

    #[error("duplicate scenario name: {0}")]
    DuplicateScenario(String),

    #[error("invalid network range: {0}")]
    InvalidNetworkRange(#[from] infraguard_common::CidrParseError),
}

// ── Unit tests ───────────────────────────────────────────────────────────────
