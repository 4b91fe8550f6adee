//! Document classifier ("router"): plain text → document type + coarse metadata.
//!
//! The classifier sends a fixed system instruction (six document types, the
//! confidence bands, the exact JSON shape) and the document text to the model
//! backend, then interprets the reply:
//!
//! | Reply | Result |
//! |-------|--------|
//! | JSON matching the shape, known type | fields exactly as emitted |
//! | JSON matching the shape, unknown type | `unknown`, confidence `0.0`, other fields kept |
//! | JSON with the wrong shape | fallback, `reasoning` explains |
//! | not JSON | fallback, `reasoning` quotes the reply |
//!
//! The reply is parsed as-is. Unlike [`crate::invoice::InvoiceExtractor`],
//! the classifier does not strip Markdown code fences, so a fenced reply
//! degrades to the fallback.
//!
//! The confidence bands in the prompt are instructions to the model. Apart
//! from clamping to `[0, 1]`, the classifier does not check them.

use crate::config::TriageConfig;
use crate::error::TriageError;
use crate::output::{ClassificationResult, DocumentType, ModelMetadata};
use crate::pipeline::llm::{resolve_backend, AgentSettings, CompletionRequest, ModelBackend};
use crate::pipeline::response::{excerpt, parse_response, ParsedResponse, NOT_JSON_PREFIX};
use crate::prompts::{classifier_user_message, CLASSIFIER_SYSTEM_PROMPT};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const AGENT: &str = "classifier";

/// Diagnostic prefix for JSON replies that do not fit the classification shape.
pub const WRONG_SHAPE_PREFIX: &str = "Response did not match the classification schema: ";

/// The classification shape as the model emits it, before validation.
#[derive(Debug, Deserialize)]
struct RawClassification {
    document_type: Option<String>,
    confidence: Option<f64>,
    vendor_name: Option<String>,
    project_name: Option<String>,
    document_date: Option<String>,
    amount: Option<f64>,
    reasoning: Option<String>,
}

/// Classifies document text through a [`ModelBackend`].
pub struct DocumentClassifier {
    backend: Arc<dyn ModelBackend>,
    settings: AgentSettings,
}

impl DocumentClassifier {
    /// Build a classifier, resolving the backend from `config`.
    ///
    /// # Errors
    /// [`TriageError::Configuration`] when no provider can be created.
    pub fn new(config: &TriageConfig) -> Result<Self, TriageError> {
        Ok(Self::with_backend(resolve_backend(config)?, config))
    }

    /// Build a classifier over an explicit backend.
    pub fn with_backend(backend: Arc<dyn ModelBackend>, config: &TriageConfig) -> Self {
        Self {
            backend,
            settings: AgentSettings::new(AGENT, config, config.classifier_max_tokens),
        }
    }

    /// Provenance attached to every result.
    pub fn metadata(&self) -> ModelMetadata {
        self.settings.metadata()
    }

    /// The exact request sent for `text`.
    pub fn request_for(&self, text: &str) -> CompletionRequest {
        self.settings
            .request(CLASSIFIER_SYSTEM_PROMPT, classifier_user_message(text))
    }

    /// Classify `text`.
    ///
    /// Always returns a well-formed result when the backend answers, whatever
    /// it answered.
    ///
    /// # Errors
    /// [`TriageError::ModelBackend`] / [`TriageError::ModelTimeout`] when the
    /// backend call itself fails.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult, TriageError> {
        info!("Classifying document ({} chars)", text.chars().count());
        let request = self.request_for(text);
        let raw = self
            .settings
            .complete(self.backend.as_ref(), &request)
            .await?;
        let result = self.interpret(&raw);
        info!(
            "Classified as {} (confidence {:.2})",
            result.document_type, result.confidence
        );
        Ok(result)
    }

    /// Turn a raw model reply into a result. Pure; no backend call.
    pub fn interpret(&self, raw: &str) -> ClassificationResult {
        let metadata = self.metadata();
        match parse_response::<RawClassification>(raw) {
            ParsedResponse::Parsed(parsed) => validate(parsed, metadata),
            ParsedResponse::NotJson(e) => {
                warn!("Classifier reply is not JSON: {}", e);
                ClassificationResult::fallback(
                    format!("{NOT_JSON_PREFIX}{}", excerpt(raw)),
                    metadata,
                )
            }
            ParsedResponse::WrongShape(e) => {
                warn!("Classifier reply has the wrong shape: {}", e);
                ClassificationResult::fallback(
                    format!("{WRONG_SHAPE_PREFIX}{}", excerpt(raw)),
                    metadata,
                )
            }
        }
    }
}

/// Enforce the enum and range invariants on a shape-valid reply.
fn validate(raw: RawClassification, metadata: ModelMetadata) -> ClassificationResult {
    let label = raw.document_type.unwrap_or_default();
    let mut confidence = raw.confidence.unwrap_or(0.0);
    if !(0.0..=1.0).contains(&confidence) {
        warn!("Classifier confidence {} outside [0, 1]; clamping", confidence);
        confidence = confidence.clamp(0.0, 1.0);
    }

    let (document_type, confidence, reasoning) = match DocumentType::from_label(&label) {
        Some(t) => (t, confidence, raw.reasoning),
        None => {
            warn!("Unrecognised document type {:?}; coercing to unknown", label);
            let note = format!("Unrecognised document type {:?}", label);
            let reasoning = match raw.reasoning {
                Some(r) => format!("{note}: {r}"),
                None => note,
            };
            (DocumentType::Unknown, 0.0, Some(reasoning))
        }
    };
    debug!("Validated classification: {}", document_type);

    ClassificationResult {
        document_type,
        confidence,
        vendor_name: raw.vendor_name,
        project_name: raw.project_name,
        document_date: raw.document_date,
        amount: raw.amount,
        reasoning,
        model_metadata: metadata,
    }
}
