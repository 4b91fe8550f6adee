//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn TriageProgressCallback>`] via
//! [`crate::config::TriageConfigBuilder::progress_callback`] to receive events
//! as the pipeline moves through OCR, classification, and invoice extraction.
//! The CLI uses this to drive its spinner; library users can forward events
//! to a channel, a database record, or a log.
//!
//! # Example
//!
//! ```rust
//! use doc_triage::{Stage, TriageConfig, TriageProgressCallback};
//! use std::sync::Arc;
//!
//! struct LogStages;
//!
//! impl TriageProgressCallback for LogStages {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} finished in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = TriageConfig::builder()
//!     .progress_callback(Arc::new(LogStages) as Arc<dyn TriageProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::DocumentType;
use std::fmt;
use std::sync::Arc;

/// One step of the triage pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ExtractText,
    Classify,
    ExtractInvoice,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ExtractText => "text extraction",
            Stage::Classify => "classification",
            Stage::ExtractInvoice => "invoice extraction",
        })
    }
}

/// Called by the pipeline as it runs each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// pipeline may be shared across tasks.
pub trait TriageProgressCallback: Send + Sync {
    /// Called just before a stage starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when invoice extraction is skipped because of the detected type.
    fn on_invoice_skipped(&self, document_type: DocumentType) {
        let _ = document_type;
    }

    /// Called once after the last stage.
    fn on_pipeline_complete(&self, document_type: DocumentType, total_ms: u64) {
        let _ = (document_type, total_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TriageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TriageConfig`].
pub type ProgressCallback = Arc<dyn TriageProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TriageProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }

        fn on_invoice_skipped(&self, document_type: DocumentType) {
            self.events.lock().unwrap().push(format!("skip {document_type}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Classify);
        cb.on_stage_complete(Stage::Classify, 12);
        cb.on_invoice_skipped(DocumentType::Contract);
        cb.on_pipeline_complete(DocumentType::Contract, 40);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let recorder = Recorder::default();
        recorder.on_stage_start(Stage::ExtractText);
        recorder.on_stage_complete(Stage::ExtractText, 5);
        recorder.on_invoice_skipped(DocumentType::Variation);

        let events = recorder.events.lock().unwrap();
        assert_eq!(*events, vec!["start text extraction", "skip variation"]);
    }
}
