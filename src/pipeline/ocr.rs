//! Text extraction: binary document → plain text via a document-analysis service.
//!
//! ## Service protocol
//!
//! Azure Document Intelligence analyses documents asynchronously:
//!
//! ```text
//! POST {endpoint}/documentintelligence/documentModels/{model}:analyze?api-version={v}
//!   body: raw document bytes            ──▶ 202 Accepted, Operation-Location: <url>
//! GET  <url>                            ──▶ {"status": "running"}      (repeat)
//! GET  <url>                            ──▶ {"status": "succeeded", "analyzeResult": {…}}
//! ```
//!
//! [`AzureReadClient`] hides the polling: callers see one awaited call that
//! either returns every recognised line or fails. Nothing partial is ever
//! returned.
//!
//! Only line text is consumed. Bounding boxes, spans, and per-word
//! confidences in the service response are ignored.

use crate::config::OcrConfig;
use crate::error::{BackendError, TriageError};
use crate::pipeline::input::{read_document_bytes, Document};
use crate::pipeline::response::excerpt;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "operation-location";

/// Recognised text of a whole document, in service order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub pages: Vec<DocumentPage>,
}

/// One page of recognised text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPage {
    #[serde(default)]
    pub page_number: u32,
    /// Absent when the page has no text.
    #[serde(default)]
    pub lines: Vec<DocumentLine>,
}

/// One recognised line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub content: String,
}

impl AnalyzeResult {
    /// All line contents, page by page then line by line, joined with `\n`.
    pub fn joined_text(&self) -> String {
        self.pages
            .iter()
            .flat_map(|page| page.lines.iter())
            .map(|line| line.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Total number of recognised lines.
    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }
}

/// A document-analysis (OCR) service.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Analyse `document` and return its recognised text.
    async fn analyze(&self, document: &[u8]) -> Result<AnalyzeResult, BackendError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "ocr"
    }
}

// ── Azure Document Intelligence ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    analyze_result: Option<AnalyzeResult>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

impl ServiceError {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "no details".to_string(),
        }
    }
}

/// [`OcrBackend`] for the Azure Document Intelligence REST API.
pub struct AzureReadClient {
    http: reqwest::Client,
    config: OcrConfig,
}

impl AzureReadClient {
    pub fn new(config: OcrConfig) -> Result<Self, TriageError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TriageError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            self.config.endpoint, self.config.model_id, self.config.api_version
        )
    }

    async fn submit(&self, document: &[u8]) -> Result<String, BackendError> {
        let response = self
            .http
            .post(self.analyze_url())
            .header(KEY_HEADER, &self.config.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(document.to_vec())
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        response
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                BackendError::Malformed(format!(
                    "HTTP {} without an Operation-Location header",
                    status.as_u16()
                ))
            })
    }

    async fn poll(&self, operation_url: &str) -> Result<AnalyzeResult, BackendError> {
        let default_wait = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            let response = self
                .http
                .get(operation_url)
                .header(KEY_HEADER, &self.config.api_key)
                .send()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(status_error(status, response).await);
            }

            let wait = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default_wait);

            let operation: AnalyzeOperation = response
                .json()
                .await
                .map_err(|e| BackendError::Malformed(e.to_string()))?;

            match operation.status.as_str() {
                "succeeded" => {
                    return operation.analyze_result.ok_or_else(|| {
                        BackendError::Malformed("succeeded without analyzeResult".into())
                    });
                }
                "failed" | "canceled" => {
                    let detail = operation
                        .error
                        .map(|e| e.describe())
                        .unwrap_or_else(|| operation.status.clone());
                    return Err(BackendError::AnalysisFailed(detail));
                }
                other => {
                    debug!("OCR operation {other}; polling again in {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[async_trait]
impl OcrBackend for AzureReadClient {
    async fn analyze(&self, document: &[u8]) -> Result<AnalyzeResult, BackendError> {
        let secs = self.config.timeout_secs;
        let run = async {
            let operation_url = self.submit(document).await?;
            debug!("OCR operation accepted: {}", operation_url);
            self.poll(&operation_url).await
        };
        tokio::time::timeout(Duration::from_secs(secs), run)
            .await
            .map_err(|_| BackendError::Timeout { secs })?
    }

    fn name(&self) -> &str {
        "azure-document-intelligence"
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> BackendError {
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::Auth(format!("HTTP {}: {}", status.as_u16(), excerpt(&body)))
        }
        _ => BackendError::Http {
            status: status.as_u16(),
            body: excerpt(&body),
        },
    }
}

// ── Text extractor ───────────────────────────────────────────────────────

/// Converts documents to plain text through an [`OcrBackend`].
pub struct TextExtractor {
    backend: Arc<dyn OcrBackend>,
}

impl TextExtractor {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    /// Extractor backed by Azure Document Intelligence.
    pub fn from_config(config: &OcrConfig) -> Result<Self, TriageError> {
        Ok(Self::new(Arc::new(AzureReadClient::new(config.clone())?)))
    }

    /// Extractor configured from `AZURE_DOC_INTEL_ENDPOINT` / `AZURE_DOC_INTEL_KEY`.
    pub fn from_env() -> Result<Self, TriageError> {
        Self::from_config(&OcrConfig::from_env()?)
    }

    /// Extract the text of the document at `path`.
    ///
    /// # Errors
    /// - [`TriageError::NotFound`] if `path` does not exist (checked before
    ///   any network call)
    /// - [`TriageError::Extraction`] for any backend failure
    pub async fn extract_text(&self, path: impl AsRef<Path>) -> Result<String, TriageError> {
        let path = path.as_ref();
        let bytes = read_document_bytes(path).await?;
        info!("Extracting text from {} ({} bytes)", path.display(), bytes.len());
        self.extract_text_from_bytes(&bytes).await
    }

    /// Extract the text of an in-memory document.
    pub async fn extract_text_from_bytes(&self, bytes: &[u8]) -> Result<String, TriageError> {
        let start = Instant::now();
        let result = self.backend.analyze(bytes).await.map_err(|source| {
            warn!("{} failed: {}", self.backend.name(), source);
            TriageError::Extraction { source }
        })?;
        let text = result.joined_text();
        debug!(
            "{}: {} pages, {} lines, {} chars in {:?}",
            self.backend.name(),
            result.pages.len(),
            result.line_count(),
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }

    /// Extract text and keep the path as the document's source.
    pub async fn extract_document(&self, path: impl AsRef<Path>) -> Result<Document, TriageError> {
        let path = path.as_ref();
        let text = self.extract_text(path).await?;
        Ok(Document::with_source(text, path))
    }
}
