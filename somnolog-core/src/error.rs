//! Error types for somnolog-core

use thiserror::Error;

/// Main error type for the somnolog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A log failed validation (bad interval, quality out of range)
    #[error("invalid sleep log: {0}")]
    InvalidLog(String),

    /// Log not found
    #[error("sleep log not found: {0}")]
    LogNotFound(String),
}

/// Result type alias for somnolog-core
pub type Result<T> = std::result::Result<T, Error>;
