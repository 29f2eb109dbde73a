//! Layered error definitions
//!
//! Categorized by source: config / sensor / store

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sensor Errors =====
    /// Motion source cannot be subscribed (permission denied, no hardware)
    #[error("motion source '{source_id}' unavailable: {reason}")]
    SensorUnavailable { source_id: String, reason: String },

    // ===== Store Errors =====
    /// Transport-level failure talking to the remote store
    #[error("store request '{operation}' failed: {message}")]
    StoreRequest { operation: String, message: String },

    /// Remote store answered but reported failure
    #[error("store rejected '{operation}': {message}")]
    StoreRejected { operation: String, message: String },

    /// A record could not be decoded or is inconsistent
    #[error("invalid step record: {0}")]
    InvalidRecord(String),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sensor unavailable error
    pub fn sensor_unavailable(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SensorUnavailable {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Create store transport error
    pub fn store_request(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreRequest {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create store rejection error
    pub fn store_rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreRejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the failure came from the remote store (retried on the next cycle)
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreRequest { .. } | Self::StoreRejected { .. })
    }
}
