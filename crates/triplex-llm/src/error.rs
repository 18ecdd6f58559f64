//! Error types for the model gateway

use thiserror::Error;

/// Errors that can occur while calling the model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Invalid gateway configuration (never retried)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure, timeout or non-success HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response envelope did not contain a model output text
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model output was not a JSON object
    #[error("Model output is not valid JSON: {0}")]
    InvalidJson(String),

    /// Model output lacked required top-level keys
    #[error("Missing required keys in model output: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

impl GatewayError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GatewayError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_message_names_keys() {
        let err = GatewayError::MissingKeys(vec!["b".to_string(), "c".to_string()]);
        assert_eq!(err.to_string(), "Missing required keys in model output: b, c");
    }

    #[test]
    fn test_config_is_not_retryable() {
        assert!(!GatewayError::Config("x".into()).is_retryable());
        assert!(GatewayError::Transport("x".into()).is_retryable());
        assert!(GatewayError::InvalidJson("x".into()).is_retryable());
        assert!(GatewayError::MissingKeys(vec![]).is_retryable());
    }
}
