//! Run events and their observers
//!
//! The pipeline reports progress as [`RunEvent`]s. Observers decide how to
//! present them; [`TracingObserver`] turns them into log events.

use crate::{RunMode, RunStats};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Why a record was not attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// An artifact already exists
    AlreadyExtracted(PathBuf),
    /// Metadata refresh found no artifact to update
    NoArtifact,
}

/// Progress of a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Records were fetched and processing begins
    RunStarted {
        /// Identifier of this run
        run_id: Uuid,
        /// Run mode
        mode: RunMode,
        /// Number of fetched records
        total: usize,
    },
    /// A record is about to be attempted
    RecordStarted {
        /// Record id
        id: String,
        /// 1-based position in input order
        position: usize,
        /// Number of fetched records
        total: usize,
    },
    /// A record was not attempted
    RecordSkipped {
        /// Record id
        id: String,
        /// Reason
        reason: SkipReason,
    },
    /// A new artifact was written
    RecordSucceeded {
        /// Record id
        id: String,
        /// JSON artifact path
        artifact: PathBuf,
        /// Time spent on the model call
        duration: Duration,
    },
    /// An existing artifact's metadata was updated
    MetadataRefreshed {
        /// Record id
        id: String,
        /// JSON artifact path
        artifact: PathBuf,
    },
    /// A record failed; the run continues
    RecordFailed {
        /// Record id
        id: String,
        /// Error description
        error: String,
    },
    /// The attempt limit stopped the run early
    LimitReached {
        /// Configured limit
        limit: usize,
        /// Records left unvisited
        unvisited: usize,
    },
    /// The run completed
    RunFinished {
        /// Final statistics
        stats: RunStats,
    },
}

/// Receives run events
pub trait RunObserver {
    /// Handle one event
    fn on_event(&mut self, event: &RunEvent);
}

/// Logs run events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { run_id, mode, total } => {
                info!(%run_id, %mode, total, "Run started");
            }
            RunEvent::RecordStarted { id, position, total } => {
                info!(record_id = %id, position, total, "Processing record");
            }
            RunEvent::RecordSkipped { id, reason } => match reason {
                SkipReason::AlreadyExtracted(path) => {
                    info!(record_id = %id, artifact = %path.display(), "Skipping record, artifact exists");
                }
                SkipReason::NoArtifact => {
                    info!(record_id = %id, "Skipping record, no artifact to refresh");
                }
            },
            RunEvent::RecordSucceeded { id, artifact, duration } => {
                info!(
                    record_id = %id,
                    artifact = %artifact.display(),
                    duration_ms = duration.as_millis() as u64,
                    "Record extracted"
                );
            }
            RunEvent::MetadataRefreshed { id, artifact } => {
                info!(record_id = %id, artifact = %artifact.display(), "Metadata refreshed");
            }
            RunEvent::RecordFailed { id, error } => {
                error!(record_id = %id, error = %error, "Record failed");
            }
            RunEvent::LimitReached { limit, unvisited } => {
                warn!(limit, unvisited, "Processing limit reached");
            }
            RunEvent::RunFinished { stats } => {
                info!(
                    total = stats.total,
                    success = stats.success,
                    skipped = stats.skipped,
                    failed = stats.failed,
                    api_calls = stats.api_calls,
                    "Run finished"
                );
                if !stats.failed_ids.is_empty() {
                    error!(failed_ids = ?stats.failed_ids, "Failed records");
                }
            }
        }
    }
}

/// Collects every event
///
/// Clones share the same log, so a clone handed to the pipeline can be
/// inspected after the run.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl EventLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl RunObserver for EventLog {
    fn on_event(&mut self, event: &RunEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
