//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_tracking;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::TrackerBlueprint;

use crate::error::CliError;

/// Load `path`, or the built-in defaults when no path is given
pub(crate) fn load_blueprint(path: Option<&Path>) -> Result<TrackerBlueprint> {
    let Some(path) = path else {
        return Ok(TrackerBlueprint::default());
    };
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
