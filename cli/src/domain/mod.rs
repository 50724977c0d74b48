//! Domain layer: types, pure parsers, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod audit;
pub mod config;
pub mod error;
pub mod report;
pub mod retry;
pub mod scenario;
pub mod tool_output;

pub use audit::{AuditCheck, AuditReport, AuditViolation};
pub use config::{HarnessSettings, PasswordSource, ScenarioConfig, build_scenario_config};
pub use error::{ConfigError, HarnessError, Stage, StageFailure};
pub use report::{RunSummary, ScenarioReport};
pub use retry::{RetryPolicy, RetryTable};
pub use scenario::{ApplyMode, Scenario, ScenarioState};
