//! OCR configuration from the process environment.
//!
//! Kept in its own test binary with a single test: it mutates process-wide
//! environment variables, which would race with any test running alongside.

use doc_triage::{OcrConfig, TextExtractor, TriageError};

const ENDPOINT: &str = "AZURE_DOC_INTEL_ENDPOINT";
const KEY: &str = "AZURE_DOC_INTEL_KEY";

fn missing_setting(err: TriageError) -> String {
    match err {
        TriageError::Configuration { what, .. } => what,
        other => panic!("expected Configuration, got {other:?}"),
    }
}

#[test]
fn from_env_requires_both_secrets() {
    // Missing key.
    std::env::set_var(ENDPOINT, "https://example.cognitiveservices.azure.com/");
    std::env::remove_var(KEY);
    assert_eq!(missing_setting(OcrConfig::from_env().unwrap_err()), "OCR access key");
    assert!(matches!(
        TextExtractor::from_env(),
        Err(TriageError::Configuration { .. })
    ));

    // Blank key.
    std::env::set_var(KEY, "   ");
    assert_eq!(missing_setting(OcrConfig::from_env().unwrap_err()), "OCR access key");

    // Missing endpoint.
    std::env::set_var(KEY, "secret");
    std::env::remove_var(ENDPOINT);
    assert_eq!(missing_setting(OcrConfig::from_env().unwrap_err()), "OCR endpoint");

    // Both present.
    std::env::set_var(ENDPOINT, "https://example.cognitiveservices.azure.com/");
    let config = OcrConfig::from_env().unwrap();
    assert_eq!(config.endpoint, "https://example.cognitiveservices.azure.com");
    assert_eq!(config.api_key, "secret");
    assert!(TextExtractor::from_env().is_ok());

    std::env::remove_var(ENDPOINT);
    std::env::remove_var(KEY);
}
