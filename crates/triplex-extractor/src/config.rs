//! Run options

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a run does with each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Call the model and write a new artifact
    Extract {
        /// Skip records that already have an artifact
        skip_existing: bool,
    },
    /// Re-attach the source text to existing artifacts without calling the model
    RefreshMetadata,
}

impl RunMode {
    /// Whether this mode calls the model
    pub fn calls_model(&self) -> bool {
        matches!(self, RunMode::Extract { .. })
    }
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Extract {
            skip_existing: false,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Extract { skip_existing: true } => write!(f, "extract (skip existing)"),
            RunMode::Extract { skip_existing: false } => write!(f, "extract"),
            RunMode::RefreshMetadata => write!(f, "refresh metadata"),
        }
    }
}

/// Options for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run mode
    pub mode: RunMode,

    /// Maximum number of records to attempt; skipped records do not count
    pub limit: Option<usize>,

    /// Restrict the run to one record (file name or record id)
    pub selector: Option<String>,
}

impl RunOptions {
    /// Options for the given mode
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the attempt limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Restrict the run to one record
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == Some(0) {
            return Err("limit must be greater than 0".to_string());
        }
        if matches!(&self.selector, Some(s) if s.trim().is_empty()) {
            return Err("selector must not be empty".to_string());
        }
        Ok(())
    }
}
