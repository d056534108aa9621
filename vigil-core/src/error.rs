//! Error types for Vigil operations

use std::time::Duration;

/// Result type for Vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

/// Error types for the Vigil orchestration subsystem.
///
/// Transport-level provider failures and schema violations have their own
/// error types (`provider::ProviderError`, `validate::ValidationError`)
/// because the orchestrator handles them without surfacing them to the
/// caller. The variants here are the hard failures a caller can observe.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// Task payload cannot support classification or any safety evaluator
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    /// Caller-supplied deadline is unusable
    #[error("Invalid deadline: {0:?} (must be greater than zero)")]
    InvalidDeadline(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reference data (interaction rules, allergy classes) failed to load
    #[error("Reference data error: {0}")]
    ReferenceData(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for VigilError {
    fn from(s: String) -> Self {
        VigilError::Other(s)
    }
}

impl From<&str> for VigilError {
    fn from(s: &str) -> Self {
        VigilError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for VigilError {
    fn from(err: anyhow::Error) -> Self {
        VigilError::Other(err.to_string())
    }
}
