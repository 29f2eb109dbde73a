//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{StoreKind, TrackerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    user_id: String,
    activity: String,
    threshold: f64,
    window_size: usize,
    refractory_ms: u64,
    debounce_ms: u64,
    store: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let profile = blueprint.profile.clone().unwrap_or_default();
            let activity = profile.activity;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    user_id: blueprint.session.user_id.clone(),
                    activity: activity.label().to_string(),
                    threshold: blueprint.activities.get(activity).threshold,
                    window_size: blueprint.detector.window_size,
                    refractory_ms: blueprint.detector.refractory_ms,
                    debounce_ms: blueprint.sync.debounce_ms,
                    store: store_label(&blueprint),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

pub(crate) fn store_label(blueprint: &TrackerBlueprint) -> String {
    match (blueprint.store.kind, blueprint.store.base_url.as_deref()) {
        (StoreKind::Http, Some(url)) => format!("http ({url})"),
        (StoreKind::Http, None) => "http".to_string(),
        (StoreKind::Memory, _) => "memory".to_string(),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &TrackerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    match &blueprint.profile {
        None => warnings.push(
            "No physical profile - distance and calories will read zero".to_string(),
        ),
        Some(profile) if !profile.is_complete() => warnings.push(format!(
            "Physical profile incomplete ({}) - distance and calories will read zero",
            profile.missing_fields().join(", ")
        )),
        Some(_) => {}
    }

    if !blueprint.goal.is_some_and(|g| g.is_configured()) {
        warnings.push("No daily goal configured - the store will be asked at startup".to_string());
    }

    if blueprint.store.kind == StoreKind::Memory {
        warnings.push("Memory store - steps are not persisted across runs".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  User: {}", summary.user_id);
            println!(
                "  Activity: {} (threshold {:.2} m/s²)",
                summary.activity, summary.threshold
            );
            println!(
                "  Detector: window {}, refractory {} ms",
                summary.window_size, summary.refractory_ms
            );
            println!("  Sync debounce: {} ms", summary.debounce_ms);
            println!("  Store: {}", summary.store);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_reports_summary() {
        let file = write_config(
            r#"
[session]
user_id = "u-1"

[profile]
weight_kg = 70.0
height_cm = 175.0
age_years = 30
activity = "jogging"

[goal]
daily_goal = 8000
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.user_id, "u-1");
        assert_eq!(summary.activity, "Jogging");
        assert_eq!(summary.threshold, 13.0);
        assert_eq!(
            result.warnings.unwrap(),
            vec!["Memory store - steps are not persisted across runs".to_string()]
        );
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config("[detector]\nwindow_size = 0\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("window_size"));
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/step-tracker.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
    }
}
