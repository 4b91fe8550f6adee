//! Result types produced by the agents and the pipeline driver.
//!
//! Every result is created fresh per call and never mutated after it is
//! returned. All declared keys are always serialised (as `null` when the
//! value is unknown) so downstream consumers only ever check for null-ness,
//! never for key existence. The one deliberate exception is
//! [`InvoiceRecord::error`], which only appears on degraded results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six document kinds the classifier may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// A bill requesting payment for goods or services.
    Invoice,
    /// A contractor's periodic claim against completed work stages.
    ProgressClaim,
    /// A formal agreement between parties.
    Contract,
    /// A change order or amendment to an existing contract.
    Variation,
    /// A property settlement statement.
    Settlement,
    /// The type could not be determined.
    #[default]
    Unknown,
}

impl DocumentType {
    /// Every variant, in prompt order.
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Invoice,
        DocumentType::ProgressClaim,
        DocumentType::Contract,
        DocumentType::Variation,
        DocumentType::Settlement,
        DocumentType::Unknown,
    ];

    /// Wire name, e.g. `"progress_claim"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::ProgressClaim => "progress_claim",
            DocumentType::Contract => "contract",
            DocumentType::Variation => "variation",
            DocumentType::Settlement => "settlement",
            DocumentType::Unknown => "unknown",
        }
    }

    /// Map a model-emitted label onto a variant.
    ///
    /// Tolerates surrounding whitespace, upper case, and spaces or hyphens in
    /// place of underscores (`"Progress Claim"`). Returns `None` for anything
    /// outside the six known labels.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalised: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalised)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a result: which model and prompt template produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model: String,
    pub prompt_version: String,
}

/// Output of the document classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub document_type: DocumentType,
    /// Model-reported confidence in `[0.0, 1.0]`; `0.0` on failure.
    pub confidence: f64,
    pub vendor_name: Option<String>,
    pub project_name: Option<String>,
    pub document_date: Option<String>,
    pub amount: Option<f64>,
    /// Model's explanation, or a diagnostic when the response was unusable.
    pub reasoning: Option<String>,
    #[serde(rename = "_meta")]
    pub model_metadata: ModelMetadata,
}

impl ClassificationResult {
    /// The degraded result returned when the model response is unusable.
    ///
    /// Failure is signalled through `reasoning`; there is no error field.
    pub fn fallback(reasoning: impl Into<String>, model_metadata: ModelMetadata) -> Self {
        Self {
            document_type: DocumentType::Unknown,
            confidence: 0.0,
            vendor_name: None,
            project_name: None,
            document_date: None,
            amount: None,
            reasoning: Some(reasoning.into()),
            model_metadata,
        }
    }
}

/// One row of an invoice's itemised charges.
///
/// Every column may be `null`; many invoices have no quantity or unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub amount: Option<f64>,
}

/// Output of the invoice field extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_number: Option<String>,
    pub vendor_name: Option<String>,
    /// Australian Business Number, `XX XXX XXX XXX` as emitted by the model.
    pub vendor_abn: Option<String>,
    /// `YYYY-MM-DD` as emitted by the model.
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub project_reference: Option<String>,
    pub description: Option<String>,
    pub line_items: Vec<LineItem>,
    pub subtotal: Option<f64>,
    pub gst_amount: Option<f64>,
    pub total_inc_gst: Option<f64>,
    pub payment_terms: Option<String>,
    /// Set only when the model response could not be used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "_meta")]
    pub model_metadata: ModelMetadata,
}

impl InvoiceRecord {
    /// The degraded result returned when the model response is unusable.
    pub fn fallback(error: impl Into<String>, model_metadata: ModelMetadata) -> Self {
        Self {
            invoice_number: None,
            vendor_name: None,
            vendor_abn: None,
            invoice_date: None,
            due_date: None,
            project_reference: None,
            description: None,
            line_items: Vec::new(),
            subtotal: None,
            gst_amount: None,
            total_inc_gst: None,
            payment_terms: None,
            error: Some(error.into()),
            model_metadata,
        }
    }

    /// Sum of the line-item amounts that are present.
    pub fn line_items_total(&self) -> f64 {
        self.line_items.iter().filter_map(|item| item.amount).sum()
    }
}

/// Wall-clock timings for one pipeline run, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageStats {
    /// `None` when the text was supplied directly and OCR was skipped.
    pub extract_ms: Option<u64>,
    pub classify_ms: u64,
    /// `None` when the document was not an invoice.
    pub invoice_ms: Option<u64>,
    pub total_ms: u64,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageOutput {
    /// Where the text came from, if known.
    pub source: Option<String>,
    /// Character count of the classified text.
    pub text_chars: usize,
    pub classification: ClassificationResult,
    /// Present only when the classifier reported an invoice.
    pub invoice: Option<InvoiceRecord>,
    pub stats: TriageStats,
}
