//! Error types for the tally library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using tally's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading inputs or scoring responses.
///
/// Degenerate data (no responses, a single version, unmapped categories) is
/// never an error; those conditions surface as empty results and
/// [`crate::analyzers::confidence::Warning`]s instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file not found.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// Scoring is enabled but the score configuration is structurally invalid.
    #[error("Scoring misconfigured: {message}")]
    InvalidScoreConfig { message: String },

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested operation needs more data than was supplied.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl Error {
    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a score configuration error.
    pub fn invalid_score_config(message: impl Into<String>) -> Self {
        Self::InvalidScoreConfig {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }
}
