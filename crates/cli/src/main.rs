//! Fidelity CLI - Main Entry Point
//!
//! Drives source and target applications through the same scenarios,
//! compares what they show, and folds the outcome into one verdict.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{compare, diff, init, score, snapshot};
use fidelity_validator::ValidatorConfig;

/// Fidelity CLI - Behavioral Validation for Migrated Web Applications
#[derive(Parser)]
#[command(name = "fidelity")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "fidelity.toml", env = "FIDELITY_CONFIG", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against source and target and score the result
    Compare(compare::CompareArgs),

    /// Merge existing component results into a unified verdict
    Score(score::ScoreArgs),

    /// Compare two saved page states
    Diff(diff::DiffArgs),

    /// Capture the state of a single page
    Snapshot(snapshot::SnapshotArgs),

    /// Write a default configuration file
    Init(init::InitArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compare(args) => {
            compare::execute(args, ValidatorConfig::load(&cli.config)?, cli.format).await?
        }
        Commands::Score(args) => {
            score::execute(args, ValidatorConfig::load(&cli.config)?, cli.format).await?
        }
        Commands::Diff(args) => diff::execute(args, cli.format).await?,
        Commands::Snapshot(args) => {
            snapshot::execute(args, ValidatorConfig::load(&cli.config)?, cli.format).await?
        }
        Commands::Init(args) => init::execute(args, &cli.config).await?,
        Commands::Version => {
            println!("Fidelity CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Behavioral fidelity validation for migrated web applications");
            println!();
            println!("Library versions:");
            println!("  fidelity-common: {}", fidelity_common::VERSION);
            println!("  fidelity-validator: {}", fidelity_validator::VERSION);
        }
    }

    Ok(())
}
