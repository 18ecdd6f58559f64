//! Provider-specific request bodies and response envelopes

use crate::{GatewayError, Granularity, Provider};
use serde::Serialize;
use serde_json::Value;

/// Request body for OpenAI-compatible chat completions
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request body for Gemini generateContent
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    system_instruction: GeminiContent<'a>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

/// Everything that goes into one request body
#[derive(Debug, Clone, Copy)]
pub struct PayloadParts<'a> {
    /// Model identifier (ignored by Gemini, which takes it from the URL)
    pub model: &'a str,
    /// System prompt read from the prompt file
    pub system_prompt: &'a str,
    /// User turn built by [`build_user_prompt`]
    pub user_prompt: &'a str,
    /// Sampling temperature
    pub temperature: f64,
    /// Output token limit
    pub max_tokens: u32,
}

/// Build the user turn: source text, abstraction level and allowed entity types
///
/// # Examples
///
/// ```
/// use triplex_llm::{payload::build_user_prompt, Granularity};
///
/// let prompt = build_user_prompt("Alice met Bob.", Granularity::new(2).unwrap(), &[]);
/// assert_eq!(prompt, "Text:\nAlice met Bob.\n\nAbstraktionslevel: 2/5");
/// ```
pub fn build_user_prompt(text: &str, granularity: Granularity, entity_types: &[String]) -> String {
    let mut prompt = format!(
        "Text:\n{}\n\nAbstraktionslevel: {}/{}",
        text,
        granularity,
        Granularity::MAX
    );

    if !entity_types.is_empty() {
        prompt.push_str("\nErlaubte Entitätstypen: ");
        prompt.push_str(&entity_types.join(", "));
    }

    prompt
}

/// Build the JSON body for the given provider
pub fn build_payload(provider: Provider, parts: PayloadParts<'_>) -> Value {
    let body = match provider {
        Provider::OpenAi => serde_json::to_value(ChatRequest {
            model: parts.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: parts.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: parts.user_prompt,
                },
            ],
            temperature: parts.temperature,
            max_tokens: parts.max_tokens,
        }),
        Provider::Gemini => serde_json::to_value(GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart {
                    text: parts.user_prompt,
                }],
            }],
            system_instruction: GeminiContent {
                parts: [GeminiPart {
                    text: parts.system_prompt,
                }],
            },
            generation_config: GeminiGenerationConfig {
                temperature: parts.temperature,
                max_output_tokens: parts.max_tokens,
            },
        }),
    };

    // Plain structs of strings and numbers always serialize
    body.unwrap_or(Value::Null)
}

/// Resolve URL and headers for one request
///
/// OpenAI-style providers get a bearer token header; Gemini takes the key as
/// a `key` query parameter.
pub fn request_target(
    provider: Provider,
    base_url: &str,
    endpoint: &str,
    api_key: Option<&str>,
) -> (String, Vec<(String, String)>) {
    let mut url = format!("{}{}", base_url.trim_end_matches('/'), endpoint);
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];

    match (provider, api_key) {
        (Provider::Gemini, Some(key)) => {
            url.push_str(if url.contains('?') { "&key=" } else { "?key=" });
            url.push_str(key);
        }
        (Provider::OpenAi, Some(key)) => {
            headers.push(("Authorization".to_string(), format!("Bearer {}", key)));
        }
        (_, None) => {}
    }

    (url, headers)
}

/// Pull the model's text out of a provider response envelope
///
/// Gemini envelopes are tried first for the Gemini provider; every provider
/// then falls back to the OpenAI `choices` shape and a bare `response` field.
pub fn extract_output_text(provider: Provider, response: &Value) -> Result<String, GatewayError> {
    if provider == Provider::Gemini {
        if let Some(text) = response
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
        {
            return Ok(text.to_string());
        }
    }

    if let Some(choice) = response.pointer("/choices/0") {
        if let Some(message) = choice.get("message") {
            let content = message.get("content").and_then(Value::as_str).unwrap_or("");
            return Ok(content.to_string());
        }
        if let Some(text) = choice.get("text").and_then(Value::as_str) {
            return Ok(text.to_string());
        }
    }

    if let Some(text) = response.get("response").and_then(Value::as_str) {
        return Ok(text.to_string());
    }

    Err(GatewayError::InvalidResponse(
        "unknown response format".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts<'a>(user_prompt: &'a str) -> PayloadParts<'a> {
        PayloadParts {
            model: "llama3.1",
            system_prompt: "Extract triples.",
            user_prompt,
            temperature: 0.1,
            max_tokens: 8000,
        }
    }

    #[test]
    fn test_user_prompt_with_entity_types() {
        let types = vec!["Person".to_string(), "Ort".to_string()];
        let prompt = build_user_prompt("Text here", Granularity::new(5).unwrap(), &types);
        assert!(prompt.ends_with("Abstraktionslevel: 5/5\nErlaubte Entitätstypen: Person, Ort"));
    }

    #[test]
    fn test_openai_payload_shape() {
        let body = build_payload(Provider::OpenAi, parts("hello"));
        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Extract triples.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 8000);
    }

    #[test]
    fn test_gemini_payload_shape() {
        let body = build_payload(Provider::Gemini, parts("hello"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Extract triples.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8000);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_request_target_openai() {
        let (url, headers) =
            request_target(Provider::OpenAi, "http://host:3000/", "/api/chat/completions", Some("k"));
        assert_eq!(url, "http://host:3000/api/chat/completions");
        assert!(headers.contains(&("Authorization".to_string(), "Bearer k".to_string())));
    }

    #[test]
    fn test_request_target_gemini() {
        let (url, headers) = request_target(
            Provider::Gemini,
            "https://generativelanguage.googleapis.com",
            "/v1beta/models/gemini-2.5-pro:generateContent",
            Some("secret"),
        );
        assert!(url.ends_with(":generateContent?key=secret"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_extract_gemini() {
        let response = json!({"candidates": [{"content": {"parts": [{"text": "{}"}]}}]});
        assert_eq!(extract_output_text(Provider::Gemini, &response).unwrap(), "{}");
    }

    #[test]
    fn test_extract_openai_message_and_text() {
        let message = json!({"choices": [{"message": {"content": "x"}}]});
        let text = json!({"choices": [{"text": "y"}]});
        assert_eq!(extract_output_text(Provider::OpenAi, &message).unwrap(), "x");
        assert_eq!(extract_output_text(Provider::OpenAi, &text).unwrap(), "y");
    }

    #[test]
    fn test_extract_bare_response() {
        let response = json!({"response": "z"});
        assert_eq!(extract_output_text(Provider::OpenAi, &response).unwrap(), "z");
    }

    #[test]
    fn test_extract_unknown() {
        let err = extract_output_text(Provider::OpenAi, &json!({"data": 1})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }
}
