//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::TrackerBlueprint;
use serde::Serialize;
use tracing::info;

use super::{load_blueprint, validate::store_label};
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    user_id: String,
    detector: DetectorInfo,
    sync: SyncInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<ProfileInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    goal: Option<GoalInfo>,
    store: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    activities: Vec<ActivityInfo>,
}

#[derive(Serialize)]
struct DetectorInfo {
    window_size: usize,
    refractory_ms: u64,
}

#[derive(Serialize)]
struct SyncInfo {
    debounce_ms: u64,
    virtual_device_policy: String,
    hourly_rate_basis: String,
}

#[derive(Serialize)]
struct ProfileInfo {
    weight_kg: f64,
    height_cm: f64,
    age_years: u32,
    activity: String,
    complete: bool,
}

#[derive(Serialize)]
struct GoalInfo {
    daily_goal: u32,
    weekly_goal: u32,
}

#[derive(Serialize)]
struct ActivityInfo {
    activity: String,
    threshold: f64,
    step_length_factor: f64,
    met_value: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = ?args.config, "Loading configuration info");

    let blueprint = load_blueprint(args.config.as_deref())?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &TrackerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let activities = if args.activities {
        blueprint
            .activities
            .iter()
            .map(|(activity, profile)| ActivityInfo {
                activity: activity.label().to_string(),
                threshold: profile.threshold,
                step_length_factor: profile.step_length_factor,
                met_value: profile.met_value,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        user_id: blueprint.session.user_id.clone(),
        detector: DetectorInfo {
            window_size: blueprint.detector.window_size,
            refractory_ms: blueprint.detector.refractory_ms,
        },
        sync: SyncInfo {
            debounce_ms: blueprint.sync.debounce_ms,
            virtual_device_policy: format!("{:?}", blueprint.sync.virtual_device_policy),
            hourly_rate_basis: format!("{:?}", blueprint.metrics.hourly_rate_basis),
        },
        profile: blueprint.profile.as_ref().map(|p| ProfileInfo {
            weight_kg: p.weight_kg,
            height_cm: p.height_cm,
            age_years: p.age_years,
            activity: p.activity.label().to_string(),
            complete: p.is_complete(),
        }),
        goal: blueprint.goal.map(|g| GoalInfo {
            daily_goal: g.daily_goal,
            weekly_goal: g.weekly_goal,
        }),
        store: store_label(blueprint),
        activities,
    }
}

fn print_config_info(blueprint: &TrackerBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Step Tracker Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("👤 Session");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ User: {}", blueprint.session.user_id);
    println!("   └─ Store: {}", store_label(blueprint));

    println!("\n🦶 Detector");
    println!("   ├─ Window: {} samples", blueprint.detector.window_size);
    println!("   └─ Refractory: {} ms", blueprint.detector.refractory_ms);

    println!("\n⚙️  Sync");
    println!("   ├─ Debounce: {} ms", blueprint.sync.debounce_ms);
    println!(
        "   ├─ Virtual devices: {:?}",
        blueprint.sync.virtual_device_policy
    );
    println!(
        "   └─ Hourly rate basis: {:?}",
        blueprint.metrics.hourly_rate_basis
    );

    match &blueprint.profile {
        Some(profile) => {
            println!("\n📏 Profile");
            println!("   ├─ Weight: {} kg", profile.weight_kg);
            println!("   ├─ Height: {} cm", profile.height_cm);
            println!("   ├─ Age: {}", profile.age_years);
            println!("   └─ Activity: {}", profile.activity);
        }
        None => println!("\n📏 Profile: (not set)"),
    }

    match blueprint.goal.filter(|g| g.is_configured()) {
        Some(goal) => println!(
            "\n🎯 Goal: {} daily, {} weekly",
            goal.daily_goal, goal.weekly_goal
        ),
        None => println!("\n🎯 Goal: (from store)"),
    }

    if args.activities {
        println!("\n🏃 Activities");
        let rows: Vec<_> = blueprint.activities.iter().collect();
        for (i, (activity, profile)) in rows.iter().enumerate() {
            let prefix = if i == rows.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {}: threshold {:.2}, step length x{:.2}, MET {:.1}",
                prefix, activity, profile.threshold, profile.step_length_factor, profile.met_value
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_info_lists_activities() {
        let args = InfoArgs {
            config: None,
            json: true,
            activities: true,
        };
        let info = build_config_info(&TrackerBlueprint::default(), &args);

        assert_eq!(info.detector.window_size, 10);
        assert_eq!(info.sync.debounce_ms, 2000);
        assert_eq!(info.activities.len(), 4);
        assert_eq!(info.activities[0].threshold, 10.5);
        assert_eq!(info.store, "memory");
        assert!(info.goal.is_none());
    }
}
