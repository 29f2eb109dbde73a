//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{Goal, StoreKind, TrackerBlueprint};
use std::time::Duration;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::session::{RunnerConfig, SessionRunner};

/// Execute the `run` command
pub async fn run_tracking(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    let profile = blueprint.profile.clone().unwrap_or_default();
    info!(
        user_id = %blueprint.session.user_id,
        activity = %profile.activity,
        threshold = blueprint.activities.get(profile.activity).threshold,
        debounce_ms = blueprint.sync.debounce_ms,
        store = ?blueprint.store.kind,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let runner = SessionRunner::new(RunnerConfig {
        blueprint,
        source: args.source,
        replay_path: args.replay.clone(),
        replay_speed: args.replay_speed,
        replay_loop: args.replay_loop,
        virtual_device: args.virtual_device,
        cadence_spm: args.cadence,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        print_steps: args.print_steps,
    });

    info!("Starting tracking session...");
    let stats = runner
        .run(shutdown_signal())
        .await
        .context("Tracking session failed")?;

    info!(
        steps = stats.report.state.steps,
        session_steps = stats.report.session_steps,
        unsynced = stats.report.unsynced_delta,
        duration_secs = stats.duration.as_secs_f64(),
        "Tracking session finished"
    );
    stats.print_summary();

    Ok(())
}

fn apply_overrides(blueprint: &mut TrackerBlueprint, args: &RunArgs) {
    if let Some(ref user_id) = args.user_id {
        info!(user_id = %user_id, "Overriding user id from CLI");
        blueprint.session.user_id = user_id.clone();
    }
    if let Some(daily_goal) = args.daily_goal {
        info!(daily_goal, "Overriding daily goal from CLI");
        let weekly_goal = blueprint.goal.map(|g| g.weekly_goal).unwrap_or(0);
        blueprint.goal = Some(Goal::new(daily_goal, weekly_goal));
    }
    if let Some(activity) = args.activity {
        info!(activity = %activity, "Overriding activity from CLI");
        blueprint.profile.get_or_insert_with(Default::default).activity = activity;
    }
    if let Some(ref base_url) = args.base_url {
        info!(base_url = %base_url, "Using REST store from CLI");
        blueprint.store.kind = StoreKind::Http;
        blueprint.store.base_url = Some(base_url.clone());
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &TrackerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("User: {}", blueprint.session.user_id);
    println!(
        "Detector: window {}, refractory {} ms",
        blueprint.detector.window_size, blueprint.detector.refractory_ms
    );
    println!("Sync debounce: {} ms", blueprint.sync.debounce_ms);
    match blueprint.goal.filter(|g| g.is_configured()) {
        Some(goal) => println!("Daily goal: {}", goal.daily_goal),
        None => println!("Daily goal: (from store)"),
    }
    match blueprint.store.base_url {
        Some(ref url) if blueprint.store.kind == StoreKind::Http => println!("Store: {url}"),
        _ => println!("Store: memory"),
    }
    println!();
}
