//! # Observability
//!
//! Logging and metrics for the step tracker.
//!
//! Every crate logs through `tracing`; this crate installs the subscriber
//! once per process and optionally exposes the `step_tracker_*` counters on a
//! Prometheus endpoint:
//!
//! | metric | labels |
//! |---|---|
//! | `step_tracker_steps_detected_total` | `activity` |
//! | `step_tracker_steps_current` | |
//! | `step_tracker_sync_writes_total` | `status` |
//! | `step_tracker_sync_skipped_total` | `reason` |
//! | `step_tracker_sync_write_latency_ms` | |
//! | `step_tracker_goal_reached_total` | |
//! | `step_tracker_reconciliations_total` | `status` |
//! | `step_tracker_samples_dropped_total` | |
//!
//! ## Example
//!
//! ```ignore
//! // `step-tracker -vv --log-format compact run`
//! observability::init_with_config(ObservabilityConfig::for_verbosity(2, false, LogFormat::Compact))?;
//! let handle = TrackingSession::spawn(source, store, options);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_goal_reached, record_reconciliation, record_samples_dropped, record_steps_current,
    record_sync_skipped, record_sync_write, RunningStats, SessionStatsAggregator, SessionSummary,
    StatsSummary,
};

/// Default Prometheus port for the tracker
pub const DEFAULT_METRICS_PORT: u16 = 9000;

/// JSON logs filtered by `RUST_LOG`, metrics on the default port
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Observability settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus port, `None` leaves the exporter off
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
    /// Use `default_log_level` even when `RUST_LOG` is set
    pub ignore_env_filter: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(DEFAULT_METRICS_PORT),
            default_log_level: "info".to_string(),
            ignore_env_filter: false,
        }
    }
}

impl ObservabilityConfig {
    /// Settings for a `-v` count and a `--quiet` flag, exporter off
    ///
    /// Quiet wins over verbosity and over `RUST_LOG`.
    pub fn for_verbosity(verbose: u8, quiet: bool, log_format: LogFormat) -> Self {
        let default_log_level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            log_format,
            metrics_port: None,
            default_log_level: default_log_level.to_string(),
            ignore_env_filter: quiet,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if self.ignore_env_filter {
            return EnvFilter::new(&self.default_log_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    /// Single line per event
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => anyhow::bail!("unknown log format: {other}"),
        }
    }
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// Install the subscriber and, when a port is set, the Prometheus exporter
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer(config.log_format))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus exporter (tracing already set up elsewhere)
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    tracing::info!(port, "step_tracker_* metrics exported");
    Ok(())
}
