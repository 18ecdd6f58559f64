//! Triplex Extractor
//!
//! Runs records from a source through the model gateway and materializes
//! the results as artifacts.
//!
//! # Architecture
//!
//! ```text
//! RecordSource → Pipeline → ModelGateway → Materializer → output dir
//!                    │
//!                    └→ RunObserver (log, terminal)
//! ```
//!
//! # Run lifecycle
//!
//! 1. Fetch all records and scan the output directory for existing artifacts.
//! 2. Per record, in input order: apply the skip policy, stop once the
//!    attempt limit is reached, otherwise call the model and write the
//!    artifact (or, in refresh mode, update the existing one).
//! 3. A failing record is counted and the run continues.
//! 4. Report [`RunStats`]; any failure makes [`RunStats::exit_code`] non-zero.
//!
//! # Example Usage
//!
//! ```no_run
//! use triplex_domain::{Origin, Record, RecordSource};
//! use triplex_extractor::{Pipeline, RunMode, RunOptions, TracingObserver};
//! use triplex_llm::{ExtractionSettings, GatewayConfig, ModelGateway, Provider};
//! use triplex_store::{Materializer, MaterializerConfig};
//!
//! struct Inline(Vec<Record>);
//!
//! impl RecordSource for Inline {
//!     type Error = std::io::Error;
//!     fn origin(&self) -> Origin {
//!         Origin::Database
//!     }
//!     fn fetch(&self, _: Option<&str>) -> Result<Vec<Record>, Self::Error> {
//!         Ok(self.0.clone())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::new(
//!     Provider::OpenAi,
//!     "http://localhost:3000",
//!     "/api/chat/completions",
//!     "llama3.1",
//!     "Extract triples as JSON.",
//! );
//! let gateway = ModelGateway::http(config, ExtractionSettings::new(3))?;
//! let materializer = Materializer::new(MaterializerConfig::default())?;
//!
//! let source = Inline(vec![Record::new("1", "Jean Paul lebte in Bayreuth.")]);
//! let mut pipeline = Pipeline::new(source, gateway, materializer, "output_json")
//!     .with_observer(TracingObserver);
//!
//! let stats = pipeline
//!     .run(&RunOptions::new(RunMode::Extract { skip_existing: true }))
//!     .await?;
//! println!("{}", stats.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod events;
mod pipeline;
mod stats;

#[cfg(test)]
mod tests;

pub use config::{RunMode, RunOptions};
pub use error::PipelineError;
pub use events::{EventLog, RunEvent, RunObserver, SkipReason, TracingObserver};
pub use pipeline::Pipeline;
pub use stats::RunStats;
