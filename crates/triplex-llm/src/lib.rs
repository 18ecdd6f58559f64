//! Triplex Model Gateway
//!
//! Turns one [`Record`](triplex_domain::Record) into one validated extraction
//! document by calling an external LLM API.
//!
//! # Architecture
//!
//! - [`ModelGateway`] builds the provider payload, sends it through a
//!   [`Transport`], strips code fences from the answer, parses and validates it
//! - [`RetryPolicy`] decides how often and how long to wait; waiting goes
//!   through a [`Sleeper`] so tests never block on a real clock
//! - [`HttpTransport`] is the reqwest-backed transport used in production
//!
//! # Providers
//!
//! - `openai`: chat-completions style `messages` payload, bearer token auth
//! - `gemini`: `contents`/`systemInstruction` payload, key in the query string
//!
//! # Examples
//!
//! ```
//! use triplex_llm::{strip_fence, parse_document};
//!
//! let doc = parse_document(strip_fence("```json\n{\"a\": 1}\n```")).unwrap();
//! assert_eq!(doc["a"], 1);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod gateway;
pub mod mock;
pub mod parse;
pub mod payload;
pub mod provider;
pub mod retry;
pub mod transport;

pub use error::GatewayError;
pub use gateway::{ExtractionSettings, GatewayConfig, ModelGateway};
pub use mock::{MockTransport, RecordingSleeper};
pub use parse::{parse_document, strip_fence, validate_required_keys};
pub use provider::{Granularity, Provider};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
pub use transport::{HttpTransport, Transport};
