//! Triplex Source Readers
//!
//! Implementations of [`RecordSource`](triplex_domain::RecordSource) that
//! produce `{id, text, origin_path}` records for the pipeline.
//!
//! # Sources
//!
//! - [`FileSource`]: plain-text and TEI-XML files below an input directory
//! - [`SqliteSource`]: rows of a SQLite query returning `id` and `sourcetext`
//!
//! # Examples
//!
//! ```no_run
//! use triplex_domain::RecordSource;
//! use triplex_source::FileSource;
//!
//! let source = FileSource::new("analyze", &["txt", "xml"], true).unwrap();
//! let records = source.fetch(None).unwrap();
//! println!("{} records", records.len());
//! ```

#![warn(missing_docs)]

pub mod file;
pub mod sqlite;
pub mod tei;

use std::path::PathBuf;
use thiserror::Error;

pub use file::FileSource;
pub use sqlite::SqliteSource;
pub use tei::TeiReader;

/// Errors that can occur while reading records
#[derive(Error, Debug)]
pub enum SourceError {
    /// A selector named a unit that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A file could not be read or decoded
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The configured query does not have the expected shape
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The input directory is missing or not a directory
    #[error("Invalid input directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// A built-in text pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl SourceError {
    /// Whether this is the distinguished not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}
