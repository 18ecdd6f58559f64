//! Deterministic test doubles for the transport and the clock
//!
//! # Examples
//!
//! ```
//! use triplex_llm::MockTransport;
//!
//! let transport = MockTransport::new();
//! transport.push_output(r#"{"entities": {}, "triples": []}"#);
//! assert_eq!(transport.call_count(), 0);
//! ```

use crate::{GatewayError, Sleeper, Transport};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wrap model output text in an OpenAI-style response envelope
pub fn openai_envelope(text: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
}

/// A request seen by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Target URL
    pub url: String,
    /// Headers sent
    pub headers: Vec<(String, String)>,
    /// JSON body sent
    pub body: Value,
}

/// Scripted transport for testing
///
/// Responses are consumed in order. Once the script is exhausted the
/// fallback is returned (an error unless [`MockTransport::with_fallback`]
/// was used). Clones share the script, the recorded requests and the
/// call count.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<Value, GatewayError>>>>,
    fallback: Option<Value>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTransport {
    /// Create a transport with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unscripted request with the given model output text
    pub fn with_fallback(mut self, output: &str) -> Self {
        self.fallback = Some(openai_envelope(output));
        self
    }

    /// Queue a successful response carrying model output text
    pub fn push_output(&self, output: &str) {
        self.push_response(Ok(openai_envelope(output)));
    }

    /// Queue a raw response or error
    pub fn push_response(&self, response: Result<Value, GatewayError>) {
        lock(&self.script).push_back(response);
    }

    /// Queue a transport failure
    pub fn push_failure(&self, message: &str) {
        self.push_response(Err(GatewayError::Transport(message.to_string())));
    }

    /// Number of requests received
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Requests received, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

impl Transport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        _timeout: Duration,
    ) -> Result<Value, GatewayError> {
        lock(&self.requests).push(RecordedRequest {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: body.clone(),
        });

        if let Some(next) = lock(&self.script).pop_front() {
            return next;
        }

        self.fallback
            .clone()
            .ok_or_else(|| GatewayError::Transport("mock script exhausted".to_string()))
    }
}

/// Fake clock that records requested sleeps and returns immediately
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create a sleeper with no recorded sleeps
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
    }
}
