//! Model output parsing and validation

use crate::GatewayError;
use triplex_domain::ExtractionDocument;

const FENCE: &str = "```";

/// Remove exactly one surrounding code fence, with or without a language tag
///
/// Text without a fence is returned trimmed but otherwise unchanged.
///
/// # Examples
///
/// ```
/// use triplex_llm::strip_fence;
///
/// assert_eq!(strip_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
/// assert_eq!(strip_fence("```\n{}\n```"), "{}");
/// assert_eq!(strip_fence("{\"a\":1}"), "{\"a\":1}");
/// ```
pub fn strip_fence(output: &str) -> &str {
    let mut text = output.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = match rest.split_once('\n') {
            Some((tag, body)) if is_language_tag(tag) => body,
            _ => rest,
        };
    }

    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'))
}

/// Parse model output into a top-level JSON object
pub fn parse_document(text: &str) -> Result<ExtractionDocument, GatewayError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| GatewayError::InvalidJson(format!("{}: {}", e, preview(text))))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(GatewayError::InvalidJson(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Check that every required top-level key is present
///
/// # Examples
///
/// ```
/// use triplex_llm::{parse_document, validate_required_keys, GatewayError};
///
/// let doc = parse_document(r#"{"a": 1}"#).unwrap();
/// assert!(validate_required_keys(&doc, &["a".to_string()]).is_ok());
///
/// let err = validate_required_keys(&doc, &["a".to_string(), "b".to_string()]).unwrap_err();
/// assert_eq!(err, GatewayError::MissingKeys(vec!["b".to_string()]));
/// ```
pub fn validate_required_keys(
    doc: &ExtractionDocument,
    required_keys: &[String],
) -> Result<(), GatewayError> {
    let missing: Vec<String> = required_keys
        .iter()
        .filter(|key| !doc.contains_key(key.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::MissingKeys(missing))
    }
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(200).collect();
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_and_bare_parse_identically() {
        let fenced = parse_document(strip_fence("```json\n{\"a\":1}\n```")).unwrap();
        let bare = parse_document(strip_fence("{\"a\":1}")).unwrap();
        assert_eq!(fenced, bare);
        assert_eq!(fenced["a"], 1);
    }

    #[test]
    fn test_fence_without_newlines() {
        assert_eq!(strip_fence("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_only_one_fence_is_removed() {
        let text = "```json\n```inner```\n```";
        assert_eq!(strip_fence(text), "```inner```");
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(strip_fence("  \n```JSON\n{}\n```  \n"), "{}");
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_document("not json").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidJson(_)));
    }

    #[test]
    fn test_non_object_json() {
        let err = parse_document("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_missing_keys_listed_in_order() {
        let doc = parse_document("{\"b\": 1}").unwrap();
        let required = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let err = validate_required_keys(&doc, &required).unwrap_err();
        assert_eq!(err, GatewayError::MissingKeys(vec!["a".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_no_required_keys() {
        let doc = parse_document("{}").unwrap();
        assert!(validate_required_keys(&doc, &[]).is_ok());
    }
}
