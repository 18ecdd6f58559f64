//! Model gateway: one record in, one validated extraction document out
//!
//! # Examples
//!
//! ```
//! use triplex_domain::Record;
//! use triplex_llm::{
//!     ExtractionSettings, GatewayConfig, MockTransport, ModelGateway, Provider, RecordingSleeper,
//! };
//!
//! # block_on(async {
//! let transport = MockTransport::new().with_fallback(r#"{"entities": {}, "triples": []}"#);
//! let gateway = ModelGateway::new(
//!     GatewayConfig::new(Provider::OpenAi, "http://localhost:3000", "/api/chat/completions", "llama3.1", "Extract."),
//!     ExtractionSettings::new(3).with_required_keys(["entities", "triples"]),
//!     transport,
//!     RecordingSleeper::new(),
//! )
//! .unwrap();
//!
//! let doc = gateway.call(&Record::new("1", "Alice met Bob.")).await.unwrap();
//! assert!(doc.contains_key("triples"));
//! # });
//! # fn block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use crate::payload::{build_payload, build_user_prompt, extract_output_text, request_target, PayloadParts};
use crate::{
    parse_document, strip_fence, validate_required_keys, GatewayError, Granularity, HttpTransport,
    Provider, RetryPolicy, Sleeper, TokioSleeper, Transport,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use triplex_domain::{ExtractionDocument, Record};

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Connection and retry settings for the model API
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Wire shape of the API
    pub provider: Provider,
    /// Scheme, host and port, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Path appended to the base URL
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Optional API key
    pub api_key: Option<String>,
    /// System prompt sent with every request
    pub system_prompt: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Sampling temperature
    pub temperature: f64,
    /// Output token limit; the provider default when unset
    pub max_tokens: Option<u32>,
    /// Attempts and delays
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    /// Config with default timeout, temperature and retry policy
    pub fn new(
        provider: Provider,
        base_url: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            system_prompt: system_prompt.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Token limit actually sent
    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(match self.provider {
            Provider::OpenAi => 8000,
            Provider::Gemini => 65536,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.system_prompt.trim().is_empty() {
            return Err("system prompt must not be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }
        self.retry.validate()
    }
}

/// What to ask the model for
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    /// Raw abstraction level, validated when the gateway is built
    pub granularity: u8,
    /// Top-level keys the model output must contain
    pub required_keys: Vec<String>,
    /// Optional allow-list of entity types forwarded to the model
    pub entity_types: Vec<String>,
}

impl ExtractionSettings {
    /// Settings with no required keys and no entity allow-list
    pub fn new(granularity: u8) -> Self {
        Self {
            granularity,
            required_keys: Vec::new(),
            entity_types: Vec::new(),
        }
    }

    /// Set the required top-level keys
    pub fn with_required_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the entity type allow-list
    pub fn with_entity_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types = types.into_iter().map(Into::into).collect();
        self
    }
}

/// Calls the model for one record at a time with bounded retry
pub struct ModelGateway<T = HttpTransport, Z = TokioSleeper> {
    config: GatewayConfig,
    granularity: Granularity,
    required_keys: Vec<String>,
    entity_types: Vec<String>,
    transport: T,
    sleeper: Z,
    call_counter: AtomicU64,
}

impl ModelGateway {
    /// Gateway over HTTP with the real clock
    pub fn http(config: GatewayConfig, settings: ExtractionSettings) -> Result<Self, GatewayError> {
        Self::new(config, settings, HttpTransport::new()?, TokioSleeper)
    }
}

impl<T: Transport, Z: Sleeper> ModelGateway<T, Z> {
    /// Build a gateway, rejecting invalid configuration up front
    ///
    /// # Errors
    ///
    /// [`GatewayError::Config`] when the granularity is outside 1..=5 or the
    /// connection settings are invalid.
    pub fn new(
        config: GatewayConfig,
        settings: ExtractionSettings,
        transport: T,
        sleeper: Z,
    ) -> Result<Self, GatewayError> {
        let granularity = Granularity::new(settings.granularity)?;
        config.validate().map_err(GatewayError::Config)?;

        Ok(Self {
            config,
            granularity,
            required_keys: settings.required_keys,
            entity_types: settings.entity_types,
            transport,
            sleeper,
            call_counter: AtomicU64::new(0),
        })
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Configured provider
    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    /// Validated abstraction level
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Total HTTP attempts made by this gateway
    pub fn call_count(&self) -> u64 {
        self.call_counter.load(Ordering::Relaxed)
    }

    /// The transport (for inspection in tests)
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Extract one record, retrying transient failures
    ///
    /// Transport errors, unknown envelopes, invalid JSON and missing keys are
    /// all retried. The last error is returned once the policy is exhausted.
    pub async fn call(&self, record: &Record) -> Result<ExtractionDocument, GatewayError> {
        let user_prompt = build_user_prompt(&record.text, self.granularity, &self.entity_types);
        let body = build_payload(
            self.config.provider,
            PayloadParts {
                model: &self.config.model,
                system_prompt: &self.config.system_prompt,
                user_prompt: &user_prompt,
                temperature: self.config.temperature,
                max_tokens: self.config.effective_max_tokens(),
            },
        );
        let (url, headers) = request_target(
            self.config.provider,
            &self.config.base_url,
            &self.config.endpoint,
            self.config.api_key.as_deref(),
        );

        let max_attempts = self.config.retry.max_attempts;
        let mut attempt = 1;

        loop {
            let call_number = self.call_counter.fetch_add(1, Ordering::Relaxed) + 1;
            info!(
                record_id = %record.id,
                attempt,
                max_attempts,
                call_number,
                "Calling model"
            );

            let err = match self.attempt(&url, &headers, &body).await {
                Ok(doc) => {
                    info!(record_id = %record.id, attempt, call_number, "Model call succeeded");
                    return Ok(doc);
                }
                Err(err) => err,
            };

            let delay = if err.is_retryable() {
                self.config.retry.delay_after(attempt)
            } else {
                None
            };

            match delay {
                Some(delay) => {
                    warn!(
                        record_id = %record.id,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Model call failed, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    error!(
                        record_id = %record.id,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Model call failed, giving up"
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<ExtractionDocument, GatewayError> {
        let response = self
            .transport
            .post_json(url, headers, body, self.config.timeout)
            .await?;
        let output = extract_output_text(self.config.provider, &response)?;
        let doc = parse_document(strip_fence(&output))?;
        validate_required_keys(&doc, &self.required_keys)?;
        debug!(keys = doc.len(), "Model output validated");
        Ok(doc)
    }
}
