//! Error types shared across the encounter crates.
//!
//! The combat core itself never fails: bad numbers are clamped and missing
//! references degrade to safe defaults. These types cover the boundaries
//! around it, such as loading tuning files.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for encounter tooling.
#[derive(Debug, Error)]
pub enum BossroomError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A scene name that the session does not know about
    #[error("Unknown scene: {0}")]
    UnknownScene(String),
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// File contents could not be parsed
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// Path that failed
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Config could not be serialized
    #[error("failed to serialize config: {0}")]
    Serialize(String),
}

/// Result type alias for encounter tooling.
pub type Result<T> = std::result::Result<T, BossroomError>;
