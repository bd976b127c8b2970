//! Error types for Exhibit.

use thiserror::Error;

/// Main error type for Exhibit operations.
#[derive(Error, Debug)]
pub enum ExhibitError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown tour stop: {0}")]
    UnknownStop(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExhibitError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type alias for Exhibit operations.
pub type Result<T> = std::result::Result<T, ExhibitError>;
