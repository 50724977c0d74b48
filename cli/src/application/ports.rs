//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`; never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::net::IpAddr;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::ScenarioConfig;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program in `dir` and capture its output, with no time bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    async fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<Output>;

    /// Run a program in `dir`, killing it if it outlives `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Provisioning Tool Port ────────────────────────────────────────────────────

/// The declarative provisioning tool, one method per CLI verb.
///
/// Every call returns the raw process output; a non-zero exit is not an
/// error at this level. `Err` means the tool could not be run at all.
#[allow(async_fn_in_trait)]
pub trait ProvisioningTool {
    /// Prepare the working directory (providers, modules, backend).
    async fn init(&self, config: &ScenarioConfig) -> Result<Output>;
    /// Create or update the declared resources.
    async fn apply(&self, config: &ScenarioConfig) -> Result<Output>;
    /// Compute pending changes with a detailed exit code, optionally saving
    /// the plan to `out`.
    async fn plan(&self, config: &ScenarioConfig, out: Option<&Path>) -> Result<Output>;
    /// Remove everything the working directory manages.
    async fn destroy(&self, config: &ScenarioConfig) -> Result<Output>;
    /// Read one output value as JSON.
    async fn output(&self, config: &ScenarioConfig, name: &str) -> Result<Output>;
    /// Render a saved plan, as text or as JSON.
    async fn show(&self, config: &ScenarioConfig, plan: &Path, json: bool) -> Result<Output>;
}

// ── Resolver Port ─────────────────────────────────────────────────────────────

/// Hostname resolution through the system resolver.
#[allow(async_fn_in_trait)]
pub trait HostResolver {
    /// Return every address `host` resolves to.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or times out.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>>;
}

// ── Project Files Port ────────────────────────────────────────────────────────

/// Read access to files of the working directory, for static audits.
pub trait ProjectFiles {
    /// Read `relative` under the working directory; `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read_to_string(&self, relative: &Path) -> Result<Option<String>>;

    /// Names of the entries directly under the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    fn list_root(&self) -> Result<Vec<String>>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
