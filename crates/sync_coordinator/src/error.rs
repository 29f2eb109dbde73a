//! Sync coordinator error types

use contracts::ContractError;
use thiserror::Error;

/// Sync specific error
#[derive(Debug, Error)]
pub enum SyncError {
    /// The write task panicked or was aborted
    #[error("write task for user '{user_id}' did not complete: {message}")]
    WriteTask { user_id: String, message: String },

    /// Wrapped ContractError (store failures)
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SyncError {
    pub fn write_task(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteTask {
            user_id: user_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SyncError>;
