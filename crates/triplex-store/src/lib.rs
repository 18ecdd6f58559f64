//! Triplex Artifact Store
//!
//! Durable output of the pipeline: one JSON document per extracted record
//! plus a PlantUML diagram and an optional interactive HTML view.
//!
//! # Architecture
//!
//! - [`ArtifactIndex`]: maps a record to its latest artifact and names new ones
//! - [`Materializer`]: merges model output with metadata and writes all files
//! - [`diagram`], [`html`], [`layout`]: derived views of the same graph
//!
//! # Examples
//!
//! ```no_run
//! use triplex_domain::{Origin, Record};
//! use triplex_store::ArtifactIndex;
//!
//! let index = ArtifactIndex::scan("output_json", Origin::Database).unwrap();
//! if let Some(path) = index.existing(&Record::new("105", "")) {
//!     println!("already extracted: {}", path.display());
//! }
//! ```

#![warn(missing_docs)]

pub mod diagram;
pub mod error;
pub mod html;
pub mod index;
pub mod layout;
pub mod materializer;
pub mod palette;

pub use error::StoreError;
pub use index::ArtifactIndex;
pub use materializer::{ArtifactMetadata, ArtifactPaths, Materializer, MaterializerConfig};
