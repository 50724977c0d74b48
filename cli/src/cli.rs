//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;
use crate::output::OutputContext;

/// Provision real infrastructure, check it, and always tear it down
#[derive(Parser)]
#[command(
    name = "infraguard",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (`NO_COLOR` set to any non-empty value)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Settings file (default: ./infraguard.yaml if present)
    #[arg(long, global = true, env = "INFRAGUARD_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision, verify, and destroy scenarios
    Run(commands::run::RunArgs),

    /// List available scenarios
    List(commands::list::ListArgs),

    /// Audit the plan and project files without applying
    Audit(commands::audit::AuditArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command. Returns whether the command passed.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be loaded or the command fails
    /// before producing a report.
    pub async fn run(self) -> Result<bool> {
        let Cli {
            json,
            quiet,
            no_color,
            config,
            command,
        } = self;
        if let Command::Version = command {
            commands::version::run(&OutputContext::new(no_color, quiet), json);
            return Ok(true);
        }

        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            json,
            config,
        })?;
        match command {
            Command::Run(args) => commands::run::run(&app, &args).await,
            Command::List(args) => commands::list::run(&app, &args).map(|()| true),
            Command::Audit(args) => commands::audit::run(&app, &args).await,
            Command::Version => Ok(true),
        }
    }
}
