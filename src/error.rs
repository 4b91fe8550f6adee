//! Error types for the doc-triage library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`TriageError`] (**fatal**): the call cannot produce a result at all
//!   (missing secret, input file not found, OCR backend failure, model
//!   backend unreachable). Returned as `Err(TriageError)` from every public
//!   operation.
//!
//! * [`BackendError`]: what an external service reported. Backends
//!   ([`crate::pipeline::ocr::OcrBackend`], [`crate::pipeline::llm::ModelBackend`])
//!   return it; the components wrap it as the `#[source]` of a
//!   [`TriageError`] so callers see one failure kind per component
//!   regardless of the root cause.
//!
//! A model response that is not valid JSON is **not** an error: the agents
//! degrade to a well-formed default result carrying a diagnostic field.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc-triage library.
#[derive(Debug, Error)]
pub enum TriageError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A required secret or setting is absent.
    #[error("{what} is not configured.\n{hint}")]
    Configuration { what: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The OCR backend failed (network, auth, malformed document, analysis failure).
    #[error("Text extraction failed: {source}")]
    Extraction {
        #[source]
        source: BackendError,
    },

    /// The language-model backend failed for the named agent.
    #[error("Model backend error in {agent}: {source}")]
    ModelBackend {
        agent: &'static str,
        #[source]
        source: BackendError,
    },

    /// The language-model call exceeded the configured timeout.
    #[error("Model call for {agent} timed out after {secs}s\nIncrease --api-timeout.")]
    ModelTimeout { agent: &'static str, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output report.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TriageError {
    /// Shorthand for a missing-setting error.
    pub fn configuration(what: impl Into<String>, hint: impl Into<String>) -> Self {
        TriageError::Configuration {
            what: what.into(),
            hint: hint.into(),
        }
    }
}

/// A failure reported by an external OCR or language-model service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// Transport-level failure (DNS, TLS, connection reset) or provider error.
    #[error("request failed: {0}")]
    Request(String),

    /// The service rejected the credentials (HTTP 401/403).
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The service answered with an unexpected HTTP status.
    #[error("service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The service answered, but not in the documented format.
    #[error("malformed service response: {0}")]
    Malformed(String),

    /// The service accepted the document but could not analyse it.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// The service did not finish within the allotted time.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn configuration_display() {
        let e = TriageError::configuration(
            "OCR endpoint",
            "Set AZURE_DOC_INTEL_ENDPOINT.",
        );
        let msg = e.to_string();
        assert!(msg.contains("OCR endpoint"), "got: {msg}");
        assert!(msg.contains("AZURE_DOC_INTEL_ENDPOINT"), "got: {msg}");
    }

    #[test]
    fn extraction_keeps_backend_source() {
        let e = TriageError::Extraction {
            source: BackendError::Auth("invalid key".into()),
        };
        assert!(e.to_string().contains("invalid key"));
        let source = e.source().expect("source should be set");
        assert_eq!(source.to_string(), "authentication rejected: invalid key");
    }

    #[test]
    fn model_timeout_display() {
        let e = TriageError::ModelTimeout {
            agent: "classifier",
            secs: 60,
        };
        assert!(e.to_string().contains("classifier"));
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn http_error_display() {
        let e = BackendError::Http {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(e.to_string(), "service returned HTTP 503: busy");
    }
}
