//! Invoice field extractor: plain text → detailed [`InvoiceRecord`].
//!
//! Normally invoked only after the classifier reports an invoice. Mirrors
//! [`crate::router::DocumentClassifier`] with three differences:
//!
//! - the output budget is larger, since the line-item list has no fixed length;
//! - leading/trailing Markdown code fences are stripped before parsing;
//! - an unusable reply is reported through the dedicated
//!   [`InvoiceRecord::error`] field rather than a free-text field.
//!
//! ABN, date, and currency formats are instructions to the model. They are
//! not validated locally.

use crate::config::TriageConfig;
use crate::error::TriageError;
use crate::output::{InvoiceRecord, LineItem, ModelMetadata};
use crate::pipeline::llm::{resolve_backend, AgentSettings, CompletionRequest, ModelBackend};
use crate::pipeline::response::{
    excerpt, parse_response, strip_code_fences, ParsedResponse, NOT_JSON_PREFIX,
};
use crate::prompts::{invoice_user_message, INVOICE_SYSTEM_PROMPT};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const AGENT: &str = "invoice extractor";

/// Diagnostic prefix for JSON replies that do not fit the invoice shape.
pub const WRONG_SHAPE_PREFIX: &str = "Response did not match the invoice schema: ";

#[derive(Debug, Deserialize)]
struct RawInvoice {
    invoice_number: Option<String>,
    vendor_name: Option<String>,
    vendor_abn: Option<String>,
    invoice_date: Option<String>,
    due_date: Option<String>,
    project_reference: Option<String>,
    description: Option<String>,
    line_items: Option<Vec<LineItem>>,
    subtotal: Option<f64>,
    gst_amount: Option<f64>,
    total_inc_gst: Option<f64>,
    payment_terms: Option<String>,
}

impl RawInvoice {
    fn into_record(self, model_metadata: ModelMetadata) -> InvoiceRecord {
        InvoiceRecord {
            invoice_number: self.invoice_number,
            vendor_name: self.vendor_name,
            vendor_abn: self.vendor_abn,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            project_reference: self.project_reference,
            description: self.description,
            line_items: self.line_items.unwrap_or_default(),
            subtotal: self.subtotal,
            gst_amount: self.gst_amount,
            total_inc_gst: self.total_inc_gst,
            payment_terms: self.payment_terms,
            error: None,
            model_metadata,
        }
    }
}

/// Extracts invoice fields through a [`ModelBackend`].
pub struct InvoiceExtractor {
    backend: Arc<dyn ModelBackend>,
    settings: AgentSettings,
}

impl InvoiceExtractor {
    /// Build an extractor, resolving the backend from `config`.
    pub fn new(config: &TriageConfig) -> Result<Self, TriageError> {
        Ok(Self::with_backend(resolve_backend(config)?, config))
    }

    /// Build an extractor over an explicit backend.
    pub fn with_backend(backend: Arc<dyn ModelBackend>, config: &TriageConfig) -> Self {
        Self {
            backend,
            settings: AgentSettings::new(AGENT, config, config.invoice_max_tokens),
        }
    }

    /// Provenance attached to every record.
    pub fn metadata(&self) -> ModelMetadata {
        self.settings.metadata()
    }

    /// The exact request sent for `text`.
    pub fn request_for(&self, text: &str) -> CompletionRequest {
        self.settings
            .request(INVOICE_SYSTEM_PROMPT, invoice_user_message(text))
    }

    /// Extract invoice fields from `text`.
    ///
    /// # Errors
    /// [`TriageError::ModelBackend`] / [`TriageError::ModelTimeout`] when the
    /// backend call itself fails. An unusable reply is not an error.
    pub async fn extract(&self, text: &str) -> Result<InvoiceRecord, TriageError> {
        info!("Extracting invoice fields ({} chars)", text.chars().count());
        let request = self.request_for(text);
        let raw = self
            .settings
            .complete(self.backend.as_ref(), &request)
            .await?;
        let record = self.interpret(&raw);
        match record.error {
            None => info!(
                "Extracted invoice {} with {} line items",
                record.invoice_number.as_deref().unwrap_or("<no number>"),
                record.line_items.len()
            ),
            Some(ref e) => warn!("Invoice extraction degraded: {}", e),
        }
        Ok(record)
    }

    /// Turn a raw model reply into a record. Pure; no backend call.
    pub fn interpret(&self, raw: &str) -> InvoiceRecord {
        let metadata = self.metadata();
        let cleaned = strip_code_fences(raw);
        match parse_response::<RawInvoice>(&cleaned) {
            ParsedResponse::Parsed(parsed) => parsed.into_record(metadata),
            ParsedResponse::NotJson(e) => {
                warn!("Invoice reply is not JSON: {}", e);
                InvoiceRecord::fallback(format!("{NOT_JSON_PREFIX}{}", excerpt(&cleaned)), metadata)
            }
            ParsedResponse::WrongShape(e) => {
                warn!("Invoice reply has the wrong shape: {}", e);
                InvoiceRecord::fallback(
                    format!("{WRONG_SHAPE_PREFIX}{}", excerpt(&cleaned)),
                    metadata,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl ModelBackend for Unused {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
            unreachable!("interpret() must not call the backend")
        }
    }

    fn extractor() -> InvoiceExtractor {
        InvoiceExtractor::with_backend(Arc::new(Unused), &TriageConfig::default())
    }

    #[test]
    fn request_uses_invoice_budget() {
        let request = extractor().request_for("TAX INVOICE");
        assert_eq!(request.max_tokens, 2000);
        assert_eq!(request.system, INVOICE_SYSTEM_PROMPT);
        assert!(request.user.starts_with("Extract invoice data:"));
    }

    #[test]
    fn null_line_items_become_empty() {
        let record = extractor().interpret(r#"{"invoice_number": "INV-1", "line_items": null}"#);
        assert_eq!(record.invoice_number.as_deref(), Some("INV-1"));
        assert!(record.line_items.is_empty());
        assert_eq!(record.error, None);
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let raw = "```json\n{\"vendor_abn\": \"12 345 678 901\", \"subtotal\": 100.5}\n```";
        let record = extractor().interpret(raw);
        assert_eq!(record.vendor_abn.as_deref(), Some("12 345 678 901"));
        assert_eq!(record.subtotal, Some(100.5));
        assert_eq!(record.error, None);
    }

    #[test]
    fn prose_reply_sets_error() {
        let record = extractor().interpret("I could not find an invoice here.");
        assert_eq!(
            record.error.as_deref(),
            Some("Failed to parse response: I could not find an invoice here.")
        );
        assert!(record.line_items.is_empty());
        assert_eq!(record.total_inc_gst, None);
        assert_eq!(record.model_metadata, extractor().metadata());
    }

    #[test]
    fn null_line_item_columns_keep_the_record() {
        let raw = r#"{"invoice_number": "INV-1", "vendor_name": "Smith Concreting Pty Ltd",
            "total_inc_gst": 24200.0, "line_items": [
                {"description": "Concrete slab pour", "quantity": null,
                 "unit_price": null, "amount": 15000.0},
                {"description": null, "amount": null}
            ]}"#;
        let record = extractor().interpret(raw);
        assert_eq!(record.error, None);
        assert_eq!(record.invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(record.total_inc_gst, Some(24200.0));
        assert_eq!(record.line_items.len(), 2);
        assert_eq!(record.line_items[0].quantity, None);
        assert_eq!(record.line_items[0].unit_price, None);
        assert_eq!(record.line_items[0].amount, Some(15000.0));
        assert_eq!(record.line_items[1].description, None);
        assert_eq!(record.line_items_total(), 15000.0);
    }

    #[test]
    fn line_item_with_wrong_types_sets_error() {
        let raw = r#"{"line_items": [{"description": "Labour", "quantity": "three",
            "unit_price": 1500, "amount": 4500}]}"#;
        let record = extractor().interpret(raw);
        assert!(record.error.unwrap().starts_with(WRONG_SHAPE_PREFIX));
        assert!(record.line_items.is_empty());
    }
}
