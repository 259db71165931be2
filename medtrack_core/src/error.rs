//! Error types for the medtrack_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medtrack_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reference data failed validation
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Persisted state could not be written
    #[error("State error: {0}")]
    State(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
