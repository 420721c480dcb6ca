// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb: deployment rollback orchestrator

mod app;
mod color;
mod commands;
mod exit_error;
mod logging;
mod output;
mod table;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use rb_core::Config;

use crate::app::App;
use crate::commands::{execution, point, rollback};
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "rb",
    version,
    about = "Deployment rollback orchestrator",
    styles = color::styles()
)]
struct Cli {
    /// Config file (default: $RB_CONFIG, then ./rollback.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a rollback point of an environment's current state
    CreatePoint(point::CreateArgs),
    /// Revert an environment to a rollback point
    Rollback(rollback::RollbackArgs),
    /// List rollback points, newest first
    ListPoints(point::ListArgs),
    /// List rollback executions, newest first
    ListExecutions(execution::ListArgs),
    /// Show a rollback point and its snapshots
    ShowPoint {
        /// Point id or unique prefix
        id: String,
    },
    /// Show a rollback execution step by step
    ShowExecution {
        /// Execution id or unique prefix
        id: String,
    },
    /// Check every snapshot of a point without touching the environment
    ValidatePoint {
        /// Point id or unique prefix
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_error::exit_code(&e)
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = Config::load(&Config::resolve_path(cli.config.as_deref()))?;
    let state_dir = config.state_dir()?;
    let _log_guard = logging::init(&state_dir.join("logs"))?;
    let app = App::open(config, state_dir)?;
    let format = cli.output;

    match command {
        Commands::CreatePoint(args) => point::create(&app, args, format).await,
        Commands::Rollback(args) => rollback::handle(&app, args, format).await,
        Commands::ListPoints(args) => point::list(&app, args, format),
        Commands::ListExecutions(args) => execution::list(&app, args, format),
        Commands::ShowPoint { id } => point::show(&app, &id, format),
        Commands::ShowExecution { id } => execution::show(&app, &id, format),
        Commands::ValidatePoint { id } => point::validate(&app, &id, format).await,
    }
}
