//! Closed configuration types: provider and granularity

use crate::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported LLM API wire shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI-compatible chat completions (also OpenWebUI, Ollama)
    OpenAi,
    /// Google Gemini generateContent
    Gemini,
}

impl Provider {
    /// Stable lowercase name, as written to artifact metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(GatewayError::Config(format!(
                "unknown provider '{}' (allowed: openai, gemini)",
                other
            ))),
        }
    }
}

/// Abstraction level of the extraction, 1 (core claim) to 5 (maximal detail)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Granularity(u8);

impl Granularity {
    /// Lowest accepted level
    pub const MIN: u8 = 1;
    /// Highest accepted level
    pub const MAX: u8 = 5;

    /// Validate a raw level
    ///
    /// # Examples
    ///
    /// ```
    /// use triplex_llm::Granularity;
    ///
    /// assert_eq!(Granularity::new(3).unwrap().get(), 3);
    /// assert!(Granularity::new(0).is_err());
    /// assert!(Granularity::new(6).is_err());
    /// ```
    pub fn new(level: u8) -> Result<Self, GatewayError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(GatewayError::Config(format!(
                "granularity must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                level
            )))
        }
    }

    /// The raw level
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Granularity {
    type Error = GatewayError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
