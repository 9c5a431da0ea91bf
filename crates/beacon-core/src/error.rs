//! Error types for the beacon protocols.
//!
//! Only initialization-time failures surface as errors to callers.
//! Recoverable conditions (unknown pid, directories not ready yet) and all
//! shutdown-path failures are handled internally and logged, never escalated.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the beacon library.
#[derive(Debug, Error)]
pub enum BeaconError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Protocol usage errors
    #[error("World log path already set")]
    WorldLogAlreadySet,

    #[error("Beacon session already started in this process")]
    AlreadyInitialized,
}

/// Result type alias for beacon operations.
pub type Result<T> = std::result::Result<T, BeaconError>;

// Conversion implementations for common error types

impl From<std::io::Error> for BeaconError {
    fn from(err: std::io::Error) -> Self {
        BeaconError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(err: serde_json::Error) -> Self {
        BeaconError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BeaconError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BeaconError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }
}
