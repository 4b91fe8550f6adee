//! The shared contract between a model's free-form reply and a typed record.
//!
//! Both agents ask for "a single JSON object and nothing else". Models mostly
//! comply, but the reply is still untrusted text, so parsing distinguishes
//! three outcomes:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | [`ParsedResponse::Parsed`] | valid JSON that fits the declared record |
//! | [`ParsedResponse::NotJson`] | not JSON at all (prose, truncated output, …) |
//! | [`ParsedResponse::WrongShape`] | valid JSON, wrong structure or field types |
//!
//! Neither failure is an error for the caller: each agent maps both to its own
//! well-formed fallback record with a diagnostic built from [`excerpt`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

/// Maximum number of characters of a raw response quoted in a diagnostic.
pub const EXCERPT_CHARS: usize = 200;

/// Diagnostic prefix for replies that are not JSON.
pub const NOT_JSON_PREFIX: &str = "Failed to parse response: ";

/// Result of interpreting a model reply as `T`.
#[derive(Debug)]
pub enum ParsedResponse<T> {
    Parsed(T),
    NotJson(serde_json::Error),
    WrongShape(serde_json::Error),
}

/// Parse `text` as JSON, then as `T`.
pub fn parse_response<T: DeserializeOwned>(text: &str) -> ParsedResponse<T> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return ParsedResponse::NotJson(e),
    };
    match serde_json::from_value(value) {
        Ok(parsed) => ParsedResponse::Parsed(parsed),
        Err(e) => ParsedResponse::WrongShape(e),
    }
}

/// The first [`EXCERPT_CHARS`] characters of `raw`.
pub fn excerpt(raw: &str) -> String {
    raw.chars().take(EXCERPT_CHARS).collect()
}

// ── Code fences ──────────────────────────────────────────────────────────

static RE_OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*").expect("valid regex"));

static RE_CLOSING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```$").expect("valid regex"));

/// Strip a leading ```` ```json ```` (or bare ```` ``` ````) marker and a
/// trailing ```` ``` ```` marker from a reply, then trim.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_open = RE_OPENING_FENCE.replace(trimmed, "");
    let without_close = RE_CLOSING_FENCE.replace(without_open.trim_end(), "");
    without_close.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: Option<String>,
        total: Option<f64>,
    }

    #[test]
    fn parses_matching_object() {
        match parse_response::<Sample>(r#"{"name": "Acme", "total": 12.5}"#) {
            ParsedResponse::Parsed(s) => assert_eq!(
                s,
                Sample {
                    name: Some("Acme".into()),
                    total: Some(12.5)
                }
            ),
            other => panic!("expected Parsed, got {other:?}"),
        }
    }

    #[test]
    fn prose_is_not_json() {
        assert!(matches!(
            parse_response::<Sample>("I think this is an invoice."),
            ParsedResponse::NotJson(_)
        ));
    }

    #[test]
    fn wrong_types_are_wrong_shape() {
        assert!(matches!(
            parse_response::<Sample>(r#"{"name": 42}"#),
            ParsedResponse::WrongShape(_)
        ));
        assert!(matches!(
            parse_response::<Sample>("[1, 2, 3]"),
            ParsedResponse::WrongShape(_)
        ));
    }

    #[test]
    fn excerpt_is_char_bounded() {
        let long = "é".repeat(500);
        let e = excerpt(&long);
        assert_eq!(e.chars().count(), EXCERPT_CHARS);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_single_line_fence() {
        let raw = "  ```json {\"document_type\":\"invoice\"} ```  ";
        assert_eq!(strip_code_fences(raw), "{\"document_type\":\"invoice\"}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }
}
