//! Triplex Domain Layer
//!
//! Core types shared by every other Triplex crate: the input [`Record`],
//! the origin it came from, the [`RecordSource`] boundary, and a lenient
//! typed view over an extraction result document.
//!
//! ## Key Concepts
//!
//! - **Record**: one unit of source text, consumed once per run
//! - **Origin**: whether records come from files or from a database query
//! - **Extraction Result**: the model's JSON document (entities, predicates, triples)
//! - **GraphView**: read-only interpretation of that document for rendering and reports
//!
//! Entity and predicate ids are local to a single document. They are opaque
//! strings invented by the model and never shared across artifacts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use graph::{EntityView, GraphView, PredicateView, TripleView};
pub use record::{Origin, Record};
pub use traits::RecordSource;

/// A model output document: top-level JSON object as returned by the model
pub type ExtractionDocument = serde_json::Map<String, serde_json::Value>;
