// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc - Otter CI command line

mod adapters;
mod commands;
mod completions;
mod error;
mod output;
mod project;
mod render;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use commands::{prune, run, runs, show, validate};
use completions::CompletionsArgs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::error::CliError;

/// Exit code for usage, parse and graph errors
const USAGE_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "oc", version, about = "Otter CI - run CI/CD workflows locally")]
struct Cli {
    /// Project root directory
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Log progress to stderr (-vv for debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run(run::RunArgs),
    /// Check a workflow and print its stages
    Validate(validate::ValidateArgs),
    /// List recorded runs
    Runs(runs::RunsArgs),
    /// Show a recorded run
    Show(show::ShowArgs),
    /// Remove expired artifacts and old runs
    Prune(prune::PruneArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(cli_error) => eprint!("{}", cli_error),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::from(USAGE_ERROR)
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    if let Commands::Completions(args) = cli.command {
        completions::generate_completions::<Cli>(args.shell);
        return Ok(ExitCode::SUCCESS);
    }

    let root = match cli.repo {
        Some(repo) => repo,
        None => project::find_project_root(&std::env::current_dir()?),
    };
    let root = std::path::absolute(&root)?;
    tracing::debug!(root = %root.display(), "project root");

    match cli.command {
        Commands::Run(args) => return run::run(&root, args).await,
        Commands::Validate(args) => validate::validate(&root, args)?,
        Commands::Runs(args) => runs::runs(&root, args)?,
        Commands::Show(args) => show::show(&root, args)?,
        Commands::Prune(args) => prune::prune(&root, args)?,
        Commands::Completions(_) => {}
    }
    Ok(ExitCode::SUCCESS)
}

/// `OC_LOG` takes an `EnvFilter` directive; otherwise `-v` picks the level
fn setup_logging(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("OC_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
