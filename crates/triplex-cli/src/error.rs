//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Run aborted
    #[error("{0}")]
    Pipeline(#[from] triplex_extractor::PipelineError),

    /// Model gateway could not be set up
    #[error("Gateway error: {0}")]
    Gateway(#[from] triplex_llm::GatewayError),

    /// Record source could not be opened
    #[error("Source error: {0}")]
    Source(#[from] triplex_source::SourceError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
