//! Pipeline driver: extract text, classify, and extract invoice fields when
//! the document is an invoice.
//!
//! The driver adds no business logic of its own. Control flow is strictly
//! linear: each stage either succeeds or aborts the run with a fatal
//! [`TriageError`]. Degraded agent results (unparsable replies) are not
//! fatal and flow through to the output unchanged.

use crate::config::{OcrConfig, TriageConfig};
use crate::error::TriageError;
use crate::invoice::InvoiceExtractor;
use crate::output::{DocumentType, TriageOutput, TriageStats};
use crate::pipeline::input::Document;
use crate::pipeline::llm::resolve_backend;
use crate::pipeline::ocr::TextExtractor;
use crate::progress::{ProgressCallback, Stage};
use crate::router::DocumentClassifier;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Sequences text extraction, classification, and invoice extraction.
pub struct Pipeline {
    extractor: Option<TextExtractor>,
    classifier: DocumentClassifier,
    invoices: InvoiceExtractor,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    /// Compose a pipeline from ready-made components.
    pub fn new(
        extractor: Option<TextExtractor>,
        classifier: DocumentClassifier,
        invoices: InvoiceExtractor,
    ) -> Self {
        Self {
            extractor,
            classifier,
            invoices,
            progress: None,
        }
    }

    /// Build every component from configuration.
    ///
    /// Pass `ocr = None` for a pipeline that only accepts already-extracted
    /// text ([`Pipeline::run_document`]).
    ///
    /// # Errors
    /// [`TriageError::Configuration`] when the model provider cannot be
    /// created.
    pub fn from_config(config: &TriageConfig, ocr: Option<&OcrConfig>) -> Result<Self, TriageError> {
        let backend = resolve_backend(config)?;
        let extractor = ocr.map(TextExtractor::from_config).transpose()?;
        let mut pipeline = Self::new(
            extractor,
            DocumentClassifier::with_backend(backend.clone(), config),
            InvoiceExtractor::with_backend(backend, config),
        );
        pipeline.progress = config.progress_callback.clone();
        Ok(pipeline)
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn classifier(&self) -> &DocumentClassifier {
        &self.classifier
    }

    pub fn invoice_extractor(&self) -> &InvoiceExtractor {
        &self.invoices
    }

    /// The text extractor, if this pipeline was built with one.
    ///
    /// # Errors
    /// [`TriageError::Configuration`] when OCR is not configured.
    pub fn text_extractor(&self) -> Result<&TextExtractor, TriageError> {
        self.extractor.as_ref().ok_or_else(|| {
            TriageError::configuration(
                "OCR service",
                "Provide OCR settings (AZURE_DOC_INTEL_ENDPOINT / AZURE_DOC_INTEL_KEY) \
                 or pass already-extracted text.",
            )
        })
    }

    /// Run the full pipeline on the document at `path`.
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<TriageOutput, TriageError> {
        let total_start = Instant::now();
        let path = path.as_ref();
        info!("Starting triage: {}", path.display());
        let extractor = self.text_extractor()?;

        // ── Step 1: Extract text ─────────────────────────────────────────
        self.stage_start(Stage::ExtractText);
        let stage_start = Instant::now();
        let document = extractor.extract_document(path).await?;
        let extract_ms = stage_start.elapsed().as_millis() as u64;
        self.stage_complete(Stage::ExtractText, extract_ms);

        let mut output = self.run_stages(&document).await?;
        output.stats.extract_ms = Some(extract_ms);
        output.stats.total_ms = total_start.elapsed().as_millis() as u64;
        self.pipeline_complete(&output);
        Ok(output)
    }

    /// Run classification (and invoice extraction when applicable) on text
    /// that has already been extracted.
    pub async fn run_document(&self, document: &Document) -> Result<TriageOutput, TriageError> {
        let total_start = Instant::now();
        let mut output = self.run_stages(document).await?;
        output.stats.total_ms = total_start.elapsed().as_millis() as u64;
        self.pipeline_complete(&output);
        Ok(output)
    }

    async fn run_stages(&self, document: &Document) -> Result<TriageOutput, TriageError> {
        // ── Step 2: Classify ─────────────────────────────────────────────
        self.stage_start(Stage::Classify);
        let stage_start = Instant::now();
        let classification = self.classifier.classify(&document.text).await?;
        let classify_ms = stage_start.elapsed().as_millis() as u64;
        self.stage_complete(Stage::Classify, classify_ms);

        // ── Step 3: Extract invoice fields (invoices only) ───────────────
        let (invoice, invoice_ms) = if classification.document_type == DocumentType::Invoice {
            self.stage_start(Stage::ExtractInvoice);
            let stage_start = Instant::now();
            let record = self.invoices.extract(&document.text).await?;
            let ms = stage_start.elapsed().as_millis() as u64;
            self.stage_complete(Stage::ExtractInvoice, ms);
            (Some(record), Some(ms))
        } else {
            info!(
                "Skipping invoice extraction - document is: {}",
                classification.document_type
            );
            if let Some(ref cb) = self.progress {
                cb.on_invoice_skipped(classification.document_type);
            }
            (None, None)
        };

        if let Some(ref record) = invoice {
            if record.error.is_some() {
                warn!("Invoice fields unavailable for a document classified as invoice");
            }
        }

        Ok(TriageOutput {
            source: document
                .source
                .as_ref()
                .map(|p| p.display().to_string()),
            text_chars: document.char_count(),
            classification,
            invoice,
            stats: TriageStats {
                extract_ms: None,
                classify_ms,
                invoice_ms,
                total_ms: 0,
            },
        })
    }

    fn stage_start(&self, stage: Stage) {
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage);
        }
    }

    fn stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        if let Some(ref cb) = self.progress {
            cb.on_stage_complete(stage, elapsed_ms);
        }
    }

    fn pipeline_complete(&self, output: &TriageOutput) {
        info!(
            "Triage complete: {} in {}ms",
            output.classification.document_type, output.stats.total_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_pipeline_complete(output.classification.document_type, output.stats.total_ms);
        }
    }
}

/// Triage one document file with OCR settings from the environment.
///
/// # Errors
/// - [`TriageError::Configuration`] if the OCR secrets or model provider are missing
/// - [`TriageError::NotFound`] if `path` does not exist
/// - [`TriageError::Extraction`] if OCR fails
/// - [`TriageError::ModelBackend`] / [`TriageError::ModelTimeout`] if a model call fails
pub async fn triage_file(
    path: impl AsRef<Path>,
    config: &TriageConfig,
) -> Result<TriageOutput, TriageError> {
    let ocr = OcrConfig::from_env()?;
    Pipeline::from_config(config, Some(&ocr))?.run(path).await
}

/// Synchronous wrapper around [`triage_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn triage_file_sync(
    path: impl AsRef<Path>,
    config: &TriageConfig,
) -> Result<TriageOutput, TriageError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TriageError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(triage_file(path, config))
}

/// Serialise `output` as pretty JSON and write it atomically (temp file + rename).
pub async fn write_report(
    output: &TriageOutput,
    path: impl AsRef<Path>,
) -> Result<(), TriageError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| TriageError::Internal(format!("Failed to serialise report: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TriageError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| TriageError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| TriageError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
