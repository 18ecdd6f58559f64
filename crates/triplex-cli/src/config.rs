//! Configuration file loading.
//!
//! The configuration is a TOML document with three required sections:
//! `[source]`, `[api]` and `[processing]`. Every field inside a section has
//! a default except the connection settings in `[api]`.

use crate::error::{CliError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use triplex_domain::Origin;
use triplex_llm::{Backoff, ExtractionSettings, GatewayConfig, Provider, RetryPolicy};
use triplex_store::MaterializerConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Where records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Text and TEI-XML files below `input_dir`
    File,
    /// Rows of an SQLite query
    #[serde(alias = "db")]
    Database,
}

impl From<SourceKind> for Origin {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::File => Origin::File,
            SourceKind::Database => Origin::Database,
        }
    }
}

/// The `[source]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    /// Source kind
    #[serde(default = "default_kind")]
    pub kind: SourceKind,

    /// Input directory for the file origin
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Accepted file extensions
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Descend into subdirectories
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// SQLite database for the database origin
    pub database_path: Option<PathBuf>,

    /// Query yielding `id` and `sourcetext` columns
    pub query: Option<String>,
}

/// The `[api]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    /// Provider name (`openai` or `gemini`)
    pub provider: String,

    /// Base URL of the model service
    pub base_url: String,

    /// Endpoint path appended to the base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// API key
    pub api_key: Option<String>,

    /// Environment variable holding the API key, read when `api_key` is absent
    pub api_key_env: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Total attempts per record
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,

    /// Delay growth
    #[serde(default)]
    pub backoff: Backoff,

    /// Upper bound for exponential delays
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_seconds: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Output token limit; provider default when unset
    pub max_tokens: Option<u32>,
}

/// The `[processing]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingSection {
    /// Artifact directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Keys every model answer must contain
    #[serde(default = "default_required_keys")]
    pub required_keys: Vec<String>,

    /// Abstraction level, 1 to 5
    #[serde(default = "default_granularity")]
    pub granularity: u8,

    /// Entity types offered to the model
    #[serde(default)]
    pub entity_types: Vec<String>,

    /// Name of the metadata block in artifacts
    #[serde(default = "default_metadata_key")]
    pub metadata_key: String,

    /// Write the HTML view next to each artifact
    #[serde(default = "default_true")]
    pub visualization: bool,

    /// Seed for the HTML layout
    #[serde(default = "default_layout_seed")]
    pub layout_seed: u64,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    source: Option<SourceSection>,
    api: Option<ApiSection>,
    processing: Option<ProcessingSection>,
}

/// Loaded and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Record source
    pub source: SourceSection,
    /// Model service
    pub api: ApiSection,
    /// Output and extraction settings
    pub processing: ProcessingSection,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CliError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate a configuration document.
    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents)?;
        let missing = |name: &str| CliError::Config(format!("missing section [{}]", name));

        let config = Self {
            source: raw.source.ok_or_else(|| missing("source"))?,
            api: raw.api.ok_or_else(|| missing("api"))?,
            processing: raw.processing.ok_or_else(|| missing("processing"))?,
        };
        config.validate().map_err(CliError::Config)?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.provider().map_err(|e| e.to_string())?;

        if self.source.kind == SourceKind::Database {
            self.database_settings()?;
        }
        if self.source.extensions.is_empty() {
            return Err("source.extensions must not be empty".to_string());
        }
        if !(1..=5).contains(&self.processing.granularity) {
            return Err(format!(
                "processing.granularity must be between 1 and 5, got {}",
                self.processing.granularity
            ));
        }
        if self.api.max_retries == 0 {
            return Err("api.max_retries must be at least 1".to_string());
        }
        self.materializer_config(false).validate()
    }

    /// Configured provider.
    pub fn provider(&self) -> std::result::Result<Provider, triplex_llm::GatewayError> {
        self.api.provider.parse()
    }

    /// Database path and query for the database origin.
    pub fn database_settings(&self) -> std::result::Result<(&Path, &str), String> {
        let path = self
            .source
            .database_path
            .as_deref()
            .ok_or("source.database_path is required for the database origin")?;
        let query = self
            .source
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or("source.query is required for the database origin")?;
        Ok((path, query))
    }

    /// The API key, from the file or from the named environment variable.
    pub fn api_key(&self) -> Option<String> {
        self.api.api_key.clone().or_else(|| {
            self.api
                .api_key_env
                .as_deref()
                .and_then(|name| env::var(name).ok())
                .filter(|key| !key.is_empty())
        })
    }

    /// Retry policy from the `[api]` section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.api.max_retries,
            base_delay: Duration::from_secs(self.api.retry_delay_seconds),
            backoff: self.api.backoff,
            max_delay: Duration::from_secs(self.api.max_retry_delay_seconds),
        }
    }

    /// Gateway settings for the given system prompt.
    pub fn gateway_config(&self, system_prompt: &str) -> Result<GatewayConfig> {
        let mut config = GatewayConfig::new(
            self.provider()?,
            &self.api.base_url,
            &self.api.endpoint,
            &self.api.model,
            system_prompt,
        )
        .with_retry(self.retry_policy());
        config.timeout = Duration::from_secs(self.api.timeout_seconds);
        config.temperature = self.api.temperature;
        config.max_tokens = self.api.max_tokens;

        Ok(match self.api_key() {
            Some(key) => config.with_api_key(key),
            None => config,
        })
    }

    /// Extraction settings, with an optional granularity override.
    pub fn extraction_settings(&self, granularity: Option<u8>) -> ExtractionSettings {
        ExtractionSettings::new(granularity.unwrap_or(self.processing.granularity))
            .with_required_keys(self.processing.required_keys.iter().cloned())
            .with_entity_types(self.processing.entity_types.iter().cloned())
    }

    /// Materializer settings.
    pub fn materializer_config(&self, no_visualization: bool) -> MaterializerConfig {
        MaterializerConfig {
            metadata_key: self.processing.metadata_key.clone(),
            visualization: self.processing.visualization && !no_visualization,
            layout_seed: self.processing.layout_seed,
        }
    }
}

fn default_kind() -> SourceKind {
    SourceKind::File
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("analyze")
}

fn default_extensions() -> Vec<String> {
    triplex_source::file::DEFAULT_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "/api/chat/completions".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    3
}

fn default_max_retry_delay() -> u64 {
    60
}

fn default_temperature() -> f64 {
    0.1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output_json")
}

fn default_required_keys() -> Vec<String> {
    ["entities", "praedikate", "triples"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

fn default_granularity() -> u8 {
    3
}

fn default_metadata_key() -> String {
    triplex_store::materializer::DEFAULT_METADATA_KEY.to_string()
}

fn default_layout_seed() -> u64 {
    42
}
