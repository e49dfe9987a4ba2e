//! Error types for the waterfall runner
//!
//! Test failures are never errors: a child that exits non-zero is reported
//! through its `ProcessOutcome`. Errors cover bad options, bad config, and
//! a test runner that cannot be launched at all.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the waterfall runner
#[derive(Error, Debug)]
pub enum Error {
    // === Construction Errors ===
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Process Errors ===
    #[error("Failed to launch test runner '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid options error
    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions(message.into())
    }

    /// Create a spawn failure error for the given program
    pub fn spawn_failed(program: &str, source: io::Error) -> Self {
        Self::SpawnFailed {
            program: program.to_string(),
            source,
        }
    }

    /// Whether the error came from launching the runner rather than running it
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::SpawnFailed { .. })
    }
}
