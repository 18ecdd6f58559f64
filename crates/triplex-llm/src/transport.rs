//! HTTP transport boundary
//!
//! The gateway only needs "post this JSON, give me JSON back". Keeping that
//! behind a trait lets tests script responses without a server.

use crate::GatewayError;
use serde_json::Value;
use std::time::Duration;

/// One JSON-over-HTTP round trip
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// POST `body` to `url` and decode the response body as JSON
    ///
    /// Connection failures, timeouts and non-success statuses map to
    /// [`GatewayError::Transport`]; an undecodable body maps to
    /// [`GatewayError::InvalidResponse`].
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError>;
}

/// Production transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool
    pub fn new() -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        let mut request = self.client.post(url).timeout(timeout).json(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        // reqwest errors print the full URL, which carries the Gemini API key
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Transport(format!("Request timed out after {:?}", timeout))
            } else {
                GatewayError::Transport(format!("Request failed: {}", e.without_url()))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let snippet: String = error_text.chars().take(200).collect();
            return Err(GatewayError::Transport(format!("HTTP {}: {}", status, snippet)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| {
                GatewayError::InvalidResponse(format!("Failed to parse response: {}", e.without_url()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let transport = HttpTransport::new().unwrap();
        let result = transport
            .post_json(
                "http://127.0.0.1:9/unreachable",
                &[],
                &serde_json::json!({}),
                Duration::from_secs(2),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let transport = HttpTransport::new().unwrap();
        let err = transport
            .post_json(
                "http://127.0.0.1:9/v1/models/x:generateContent?key=SECRET123",
                &[],
                &serde_json::json!({}),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(!err.to_string().contains("SECRET123"));
    }
}
