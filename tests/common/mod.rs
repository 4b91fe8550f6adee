//! Deterministic stand-ins for the model and OCR services.

#![allow(dead_code)]

use async_trait::async_trait;
use doc_triage::{
    AnalyzeResult, BackendError, CompletionRequest, DocumentLine, DocumentPage, ModelBackend,
    OcrBackend, TriageConfig,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const INVOICE_TEXT: &str = "TAX INVOICE\n\
Smith Concreting Pty Ltd\n\
ABN: 12 345 678 901\n\
Invoice No: INV-2024-0892\n\
Date: 15 March 2024\n\
Due: 14 April 2024\n\
Project: Balmoral Estate - Lot 42\n\
Concrete slab pour 120m2   $18,000.00\n\
Pump hire                  $4,000.00\n\
Subtotal: $22,000.00\n\
GST: $2,200.00\n\
TOTAL: $24,200.00\n\
Payment terms: 30 days";

pub const INVOICE_CLASSIFICATION: &str = r#"{
    "document_type": "invoice",
    "confidence": 0.95,
    "vendor_name": "Smith Concreting Pty Ltd",
    "project_name": "Balmoral Estate - Lot 42",
    "document_date": "2024-03-15",
    "amount": 24200.00,
    "reasoning": "Labelled TAX INVOICE with ABN, GST and invoice number"
}"#;

pub const CONTRACT_CLASSIFICATION: &str = r#"{
    "document_type": "contract",
    "confidence": 0.88,
    "vendor_name": "Harbour Builders",
    "project_name": "Balmoral Estate",
    "document_date": "2024-01-10",
    "amount": 1500000,
    "reasoning": "Agreement with signature blocks and scope of works"
}"#;

pub const INVOICE_FIELDS: &str = r#"{
    "invoice_number": "INV-2024-0892",
    "vendor_name": "Smith Concreting Pty Ltd",
    "vendor_abn": "12 345 678 901",
    "invoice_date": "2024-03-15",
    "due_date": "2024-04-14",
    "project_reference": "Balmoral Estate - Lot 42",
    "description": "Concrete slab works",
    "line_items": [
        {"description": "Concrete slab pour 120m2", "quantity": 1, "unit_price": 18000, "amount": 18000},
        {"description": "Pump hire", "quantity": 1, "unit_price": 4000, "amount": 4000}
    ],
    "subtotal": 22000.00,
    "gst_amount": 2200.00,
    "total_inc_gst": 24200.00,
    "payment_terms": "30 days"
}"#;

pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

// ── Model stubs ──────────────────────────────────────────────────────────────

/// Replays canned replies in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Request("no scripted reply left".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledBackend;

#[async_trait]
impl ModelBackend for StalledBackend {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

/// A config whose agents talk to `backend`.
pub fn config_with(backend: Arc<dyn ModelBackend>) -> TriageConfig {
    TriageConfig::builder()
        .backend(backend)
        .build()
        .expect("valid test config")
}

// ── OCR stubs ────────────────────────────────────────────────────────────────

/// Returns a fixed analysis and counts calls.
pub struct FixedOcr {
    result: AnalyzeResult,
    calls: AtomicUsize,
}

impl FixedOcr {
    /// One page per entry, one line per `\n`-separated row.
    pub fn pages(pages: &[&str]) -> Arc<Self> {
        let pages = pages
            .iter()
            .enumerate()
            .map(|(i, text)| DocumentPage {
                page_number: i as u32 + 1,
                lines: text
                    .lines()
                    .map(|line| DocumentLine {
                        content: line.to_string(),
                    })
                    .collect(),
            })
            .collect();
        Arc::new(Self {
            result: AnalyzeResult { pages },
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrBackend for FixedOcr {
    async fn analyze(&self, _document: &[u8]) -> Result<AnalyzeResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Always fails with the given error.
pub struct FailingOcr(pub BackendError);

#[async_trait]
impl OcrBackend for FailingOcr {
    async fn analyze(&self, _document: &[u8]) -> Result<AnalyzeResult, BackendError> {
        Err(self.0.clone())
    }
}

/// Write `bytes` to a fresh temp file with the given name.
pub fn temp_document(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("write temp document");
    path
}
