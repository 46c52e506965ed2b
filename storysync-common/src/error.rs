//! Error types for storysync
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the storysync crates
#[derive(Error, Debug)]
pub enum Error {
    /// Mount configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host page errors (detached elements, failed delegation)
    #[error("Host page error: {0}")]
    Host(String),

    /// Playback control errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Mount attribute JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using the storysync Error
pub type Result<T> = std::result::Result<T, Error>;
