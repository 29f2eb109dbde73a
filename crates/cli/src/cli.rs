//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Step Tracker - accelerometer step counting with debounced persistence
#[derive(Parser, Debug)]
#[command(
    name = "step-tracker",
    author,
    version,
    about = "On-device step detection engine",
    long_about = "Detects steps from an accelerometer stream, derives distance, calories \n\
                  and pace, evaluates the daily goal and persists totals to a step store."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STEP_TRACKER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STEP_TRACKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a tracking session
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "STEP_TRACKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the user id
    #[arg(long, env = "STEP_TRACKER_USER_ID")]
    pub user_id: Option<String>,

    /// Override the daily step goal
    #[arg(long, env = "STEP_TRACKER_DAILY_GOAL")]
    pub daily_goal: Option<u32>,

    /// Override the selected activity (slow_walking, brisk_walking, jogging, running)
    #[arg(long)]
    pub activity: Option<contracts::ActivityType>,

    /// Use the REST store at this base URL
    #[arg(long, env = "STEP_TRACKER_BASE_URL")]
    pub base_url: Option<String>,

    /// Motion source
    #[arg(long, value_enum, default_value = "mock")]
    pub source: SourceKind,

    /// Recorded JSONL trace (replay source)
    #[arg(long, required_if_eq("source", "replay"))]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier
    #[arg(long, default_value = "1.0")]
    pub replay_speed: f64,

    /// Loop the replay trace
    #[arg(long)]
    pub replay_loop: bool,

    /// Report the source as a simulator
    #[arg(long)]
    pub virtual_device: bool,

    /// Mock cadence in steps per minute
    #[arg(long, default_value = "110")]
    pub cadence: f64,

    /// Session length in seconds (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "STEP_TRACKER_DURATION")]
    pub duration: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STEP_TRACKER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print every detected step
    #[arg(long)]
    pub print_steps: bool,

    /// Validate configuration and exit without tracking
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate
    #[arg(short, long, default_value = "step-tracker.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the activity table
    #[arg(long)]
    pub activities: bool,
}

/// Motion source selection
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// Synthetic gait
    #[default]
    Mock,
    /// Recorded trace
    Replay,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
