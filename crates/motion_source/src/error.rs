//! Motion source error types

use contracts::ContractError;
use thiserror::Error;

/// Motion source specific error
#[derive(Debug, Error)]
pub enum MotionSourceError {
    /// Recording could not be opened
    #[error("failed to load recording '{path}': {message}")]
    LoadFailed { path: String, message: String },

    /// A line in the recording is not a valid sample
    #[error("invalid record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl MotionSourceError {
    /// Create load error
    pub fn load_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create invalid record error
    pub fn invalid_record(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line,
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, MotionSourceError>;
