//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// The motion source could not be built
    #[error("Failed to set up motion source '{source_id}': {message}")]
    SourceSetup { source_id: String, message: String },

    /// The step store could not be built
    #[error("Failed to set up step store: {message}")]
    StoreSetup { message: String },

    #[error("Tracking session failed: {message}")]
    Session { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn source_setup(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceSetup {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn store_setup(message: impl Into<String>) -> Self {
        Self::StoreSetup {
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }
}
