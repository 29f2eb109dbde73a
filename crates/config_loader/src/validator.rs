//! Config validation
//!
//! Rules:
//! - window_size, refractory_ms, debounce_ms > 0
//! - every activity row finite and positive
//! - thresholds strictly increase from slow walking to running
//! - session.user_id non-empty, sample_channel_capacity > 0
//! - http store has an http(s) base_url

use contracts::{ContractError, StoreKind, TrackerBlueprint};

/// Validate a TrackerBlueprint
///
/// Returns the first error found, or Ok(()).
pub fn validate(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    validate_detector(blueprint)?;
    validate_sync(blueprint)?;
    validate_activities(blueprint)?;
    validate_session(blueprint)?;
    validate_store(blueprint)?;
    Ok(())
}

fn validate_detector(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let detector = &blueprint.detector;
    if detector.window_size == 0 {
        return Err(ContractError::config_validation(
            "detector.window_size",
            "window_size must be > 0",
        ));
    }
    if detector.refractory_ms == 0 {
        return Err(ContractError::config_validation(
            "detector.refractory_ms",
            "refractory_ms must be > 0",
        ));
    }
    Ok(())
}

fn validate_sync(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    if blueprint.sync.debounce_ms == 0 {
        return Err(ContractError::config_validation(
            "sync.debounce_ms",
            "debounce_ms must be > 0",
        ));
    }
    Ok(())
}

/// Every row positive and finite; thresholds ordered by intensity
fn validate_activities(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let mut previous: Option<(&str, f64)> = None;

    for (activity, profile) in blueprint.activities.iter() {
        let fields = [
            ("threshold", profile.threshold),
            ("step_length_factor", profile.step_length_factor),
            ("met_value", profile.met_value),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ContractError::config_validation(
                    format!("activities.{}.{}", activity.key(), name),
                    format!("{name} must be a finite value > 0, got {value}"),
                ));
            }
        }

        if let Some((prev_key, prev_threshold)) = previous {
            if profile.threshold <= prev_threshold {
                return Err(ContractError::config_validation(
                    format!("activities.{}.threshold", activity.key()),
                    format!(
                        "threshold ({}) must be greater than {prev_key} threshold ({prev_threshold})",
                        profile.threshold
                    ),
                ));
            }
        }
        previous = Some((activity.key(), profile.threshold));
    }
    Ok(())
}

fn validate_session(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let session = &blueprint.session;
    if session.user_id.trim().is_empty() {
        return Err(ContractError::config_validation(
            "session.user_id",
            "user_id cannot be empty",
        ));
    }
    if session.sample_channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "session.sample_channel_capacity",
            "sample_channel_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_store(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let store = &blueprint.store;
    if store.kind != StoreKind::Http {
        return Ok(());
    }

    match store.base_url.as_deref().map(str::trim) {
        None | Some("") => Err(ContractError::config_validation(
            "store.base_url",
            "http store requires base_url",
        )),
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            Err(ContractError::config_validation(
                "store.base_url",
                format!("base_url must start with http:// or https://, got '{url}'"),
            ))
        }
        Some(_) => Ok(()),
    }
}
