//! Error types for artifact storage

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing artifacts
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure while writing durable state
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// An existing artifact could not be read or interpreted
    #[error("Corrupt artifact {}: {reason}", path.display())]
    Corrupt {
        /// Offending artifact
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Document could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid store configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error threatens durable state and must stop a run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StoreError::Corrupt { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
