//! Command implementations

pub mod audit;
pub mod list;
pub mod run;
pub mod version;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::domain::HarnessSettings;

/// Settings overrides shared by commands that drive the tool.
#[derive(Args, Debug, Default)]
pub struct ToolArgs {
    /// Directory holding the resource definitions
    #[arg(short = 'C', long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Provisioning tool binary (terraform, tofu, or a path)
    #[arg(long, value_name = "BIN")]
    pub tool: Option<String>,

    /// Extra input variable, repeatable
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

impl ToolArgs {
    /// Overlay the flags onto `settings`.
    pub fn apply_to(&self, settings: &mut HarnessSettings) {
        if let Some(dir) = &self.working_dir {
            settings.working_dir.clone_from(dir);
        }
        if let Some(tool) = &self.tool {
            settings.tool.clone_from(tool);
        }
    }

    #[must_use]
    pub fn variables(&self) -> BTreeMap<String, String> {
        self.vars.iter().cloned().collect()
    }
}

/// Parse a `NAME=VALUE` pair.
///
/// # Errors
///
/// Returns an error if there is no `=` or the name is empty.
pub fn parse_var(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => anyhow::bail!("expected NAME=VALUE, got '{raw}'"),
    }
}

/// Process environment lookup used for password sources.
pub(crate) fn lookup_env(var: &str) -> Option<String> {
    std::env::var(var).ok()
}
