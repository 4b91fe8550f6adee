//! # doc-triage
//!
//! Classify scanned business documents (invoices, progress claims, contracts,
//! variations, settlement statements) and extract structured invoice fields,
//! using a cloud OCR service and a hosted language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document (PDF, image)
//!  │
//!  ├─ 1. OCR       submit bytes to Document Intelligence, join recognised lines
//!  ├─ 2. Classify  model picks one of six document types + coarse metadata
//!  └─ 3. Extract   invoices only: model fills a detailed InvoiceRecord
//! ```
//!
//! Every model reply is untrusted text. When it is not the requested JSON,
//! the agents return a well-formed default result with a diagnostic field
//! instead of failing, so callers can branch on `document_type` / `error`
//! without special error handling.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc_triage::{Document, Pipeline, TriageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider API key (ANTHROPIC_API_KEY by default) is read from the environment.
//!     let config = TriageConfig::default();
//!     let pipeline = Pipeline::from_config(&config, None)?;
//!     let doc = Document::new("TAX INVOICE\nABN: 12 345 678 901\n...");
//!     let output = pipeline.run_document(&doc).await?;
//!     println!("{}", serde_json::to_string_pretty(&output)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc-triage` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc-triage = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod evaluate;
pub mod invoice;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod router;
pub mod triage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, TriageConfig, TriageConfigBuilder};
pub use error::{BackendError, TriageError};
pub use evaluate::{evaluate, EvaluationReport, FieldScore};
pub use invoice::InvoiceExtractor;
pub use output::{
    ClassificationResult, DocumentType, InvoiceRecord, LineItem, ModelMetadata, TriageOutput,
    TriageStats,
};
pub use pipeline::input::Document;
pub use pipeline::llm::{CompletionRequest, ModelBackend, ProviderBackend};
pub use pipeline::ocr::{AnalyzeResult, AzureReadClient, DocumentLine, DocumentPage, OcrBackend, TextExtractor};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, TriageProgressCallback};
pub use router::DocumentClassifier;
pub use triage::{triage_file, triage_file_sync, write_report, Pipeline};
