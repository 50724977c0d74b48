//! List command: show the scenario catalog.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::domain::scenario::{builtin_scenarios, merge_catalog};
use crate::infra::config::load_scenario_file;
use crate::output::{HumanRenderer, json};

/// Arguments for the list command.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Include scenarios from a YAML file
    #[arg(long, value_name = "FILE")]
    pub scenarios_file: Option<PathBuf>,
}

/// Print the built-in (and file) scenarios.
///
/// # Errors
///
/// Returns an error if the scenario file cannot be loaded or repeats a name.
pub fn run(app: &AppContext, args: &ListArgs) -> Result<()> {
    let extra = match &args.scenarios_file {
        Some(path) => load_scenario_file(path)?,
        None => Vec::new(),
    };
    let catalog = merge_catalog(builtin_scenarios(), extra)?;
    if app.is_json() {
        println!("{}", json::format_catalog(&catalog)?);
    } else {
        HumanRenderer::new(&app.output).render_catalog(&catalog);
    }
    Ok(())
}
