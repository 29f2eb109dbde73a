//! # step-tracker
//!
//! Counts steps from an accelerometer source and keeps a step store in sync.
//!
//! ```text
//! step-tracker run --user-id u-1 --daily-goal 8000            # synthetic walk, memory store
//! step-tracker run --source replay --replay walk.jsonl --dry-run
//! step-tracker validate -c tracker.toml
//! step-tracker info -c tracker.toml --json
//! ```

mod cli;
mod commands;
mod error;
mod session;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_tracking, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    observability::init_with_config(ObservabilityConfig::for_verbosity(
        cli.verbose,
        cli.quiet,
        cli.log_format.into(),
    ))?;

    info!(version = env!("CARGO_PKG_VERSION"), "step-tracker starting");

    let result = match &cli.command {
        Commands::Run(args) => run_tracking(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
