/// Error types for the call-out facility
///
/// A missing call-out is not an error: lookups report it through
/// `CallOutLookup::NotFound`. The variants here cover bad input,
/// the optional capacity bound, callback failures and configuration.

use thiserror::Error;

/// Main error type for call-out operations
#[derive(Error, Debug)]
pub enum CalloutError {
    // ========================================
    // Scheduling Errors
    // ========================================

    #[error("Invalid input for field '{field}': {reason}")]
    ValidationError {
        field: String,
        reason: String,
    },

    #[error("Call-out table full ({max} entries)")]
    CapacityExceeded {
        max: usize,
    },

    // ========================================
    // Dispatch Errors
    // ========================================

    #[error("Object {owner} has no method '{method}'")]
    UnknownMethod {
        owner: String,
        method: String,
    },

    #[error("Callback failed: {0}")]
    CallbackFailed(String),

    // ========================================
    // Configuration Errors
    // ========================================

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for call-out operations
pub type Result<T> = std::result::Result<T, CalloutError>;

impl CalloutError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        CalloutError::ValidationError {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// ========================================
// Unit Tests
// ========================================
