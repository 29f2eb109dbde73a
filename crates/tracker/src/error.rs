//! Session error types

use contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The session task is no longer running
    #[error("tracking session has already stopped")]
    Stopped,

    /// The session task panicked
    #[error("tracking session task failed: {0}")]
    Join(String),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Result alias
pub type Result<T> = std::result::Result<T, SessionError>;
