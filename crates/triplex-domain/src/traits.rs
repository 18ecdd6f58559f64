//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and its inputs.
//! Implementations live in other crates (triplex-source).

use crate::record::{Origin, Record};

/// Trait for producing input records
///
/// A source is finite and restartable: every call to [`RecordSource::fetch`]
/// starts over from the beginning.
pub trait RecordSource {
    /// Error type for fetch operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Which origin the records belong to
    fn origin(&self) -> Origin;

    /// Fetch all records, or only the unit named by `selector`
    ///
    /// A selector naming a unit that does not exist must produce a
    /// distinguishable not-found error.
    fn fetch(&self, selector: Option<&str>) -> Result<Vec<Record>, Self::Error>;
}
