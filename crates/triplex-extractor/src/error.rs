//! Error types for the orchestrator

use thiserror::Error;
use triplex_store::StoreError;

/// Errors that abort a run
///
/// Per-record failures never surface here; they are counted in
/// [`crate::RunStats`] instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The record source could not be read
    #[error("Source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An artifact could not be written
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Invalid run options
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Wrap a source error
    pub fn from_source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PipelineError::Source(Box::new(error))
    }
}
