//! Error types for GrackerKYC infrastructure

use thiserror::Error;

/// Errors that can occur while verifying, committing or querying
#[derive(Error, Debug)]
pub enum KycError {
    /// A required input was missing or malformed
    #[error("validation error on {field}: {message}")]
    Validation { field: String, message: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The audit store could not be written or read
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Recomputed hash or previous-hash link does not match
    #[error("ledger integrity violation at block {index}: {reason}")]
    LedgerIntegrity { index: u64, reason: String },

    /// Payload could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl KycError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        KycError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the failure happened before any shared state was touched
    pub fn is_client_error(&self) -> bool {
        matches!(self, KycError::Validation { .. })
    }
}

/// Result type for GrackerKYC operations
pub type Result<T> = std::result::Result<T, KycError>;
