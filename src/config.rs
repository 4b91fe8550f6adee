//! Configuration types for document triage.
//!
//! Two structs cover the two external services:
//!
//! * [`TriageConfig`]: language-model settings shared by the classifier and
//!   the invoice extractor (provider, model, prompt version, output budgets,
//!   timeout). Built via [`TriageConfigBuilder`].
//! * [`OcrConfig`]: the OCR service endpoint and key, validated when the
//!   config is built so a missing secret fails before any document is read.
//!
//! Credentials are never read lazily at call time: [`OcrConfig::from_env`]
//! and the agent constructors resolve everything up front.

use crate::error::TriageError;
use crate::pipeline::llm::ModelBackend;
use crate::progress::ProgressCallback;
use crate::prompts::{
    CLASSIFIER_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_PROMPT_VERSION, DEFAULT_PROVIDER,
    INVOICE_MAX_TOKENS,
};
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the OCR service endpoint URL.
pub const OCR_ENDPOINT_ENV: &str = "AZURE_DOC_INTEL_ENDPOINT";

/// Environment variable holding the OCR service access key.
pub const OCR_KEY_ENV: &str = "AZURE_DOC_INTEL_KEY";

/// Language-model configuration for the classifier and invoice extractor.
///
/// # Example
/// ```rust
/// use doc_triage::TriageConfig;
///
/// let config = TriageConfig::builder()
///     .model("claude-sonnet-4-20250514")
///     .prompt_version("v2")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.classifier_max_tokens, 1000);
/// ```
#[derive(Clone)]
pub struct TriageConfig {
    /// Model identifier recorded in every result's metadata. Default: `claude-sonnet-4-20250514`.
    pub model: String,

    /// Provider name passed to `ProviderFactory`. Default: `anthropic`.
    ///
    /// The provider reads its API key (e.g. `ANTHROPIC_API_KEY`) from the
    /// environment.
    pub provider_name: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed model backend. Takes precedence over `provider`.
    ///
    /// This is the injection point for deterministic stubs in tests.
    pub backend: Option<Arc<dyn ModelBackend>>,

    /// Prompt template tag recorded in every result's metadata. Default: `v1`.
    pub prompt_version: String,

    /// Output budget for a classification. Default: 1000.
    pub classifier_max_tokens: usize,

    /// Output budget for an invoice extraction. Default: 2000.
    ///
    /// Larger than the classifier's because the line-item list has no fixed
    /// length.
    pub invoice_max_tokens: usize,

    /// Sampling temperature. Default: `None` (provider default).
    pub temperature: Option<f32>,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional stage-event sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: DEFAULT_PROVIDER.to_string(),
            provider: None,
            backend: None,
            prompt_version: DEFAULT_PROMPT_VERSION.to_string(),
            classifier_max_tokens: CLASSIFIER_MAX_TOKENS,
            invoice_max_tokens: INVOICE_MAX_TOKENS,
            temperature: None,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TriageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriageConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("prompt_version", &self.prompt_version)
            .field("classifier_max_tokens", &self.classifier_max_tokens)
            .field("invoice_max_tokens", &self.invoice_max_tokens)
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl TriageConfig {
    /// Create a new builder for `TriageConfig`.
    pub fn builder() -> TriageConfigBuilder {
        TriageConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TriageConfig`].
#[derive(Debug)]
pub struct TriageConfigBuilder {
    config: TriageConfig,
}

impl TriageConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn prompt_version(mut self, version: impl Into<String>) -> Self {
        self.config.prompt_version = version.into();
        self
    }

    pub fn classifier_max_tokens(mut self, n: usize) -> Self {
        self.config.classifier_max_tokens = n;
        self
    }

    pub fn invoice_max_tokens(mut self, n: usize) -> Self {
        self.config.invoice_max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TriageConfig, TriageError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(TriageError::InvalidConfig("Model must not be empty".into()));
        }
        if c.prompt_version.trim().is_empty() {
            return Err(TriageError::InvalidConfig(
                "Prompt version must not be empty".into(),
            ));
        }
        if c.classifier_max_tokens == 0 || c.invoice_max_tokens == 0 {
            return Err(TriageError::InvalidConfig(
                "Output token budgets must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(TriageError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// Connection settings for the OCR (document analysis) service.
#[derive(Clone)]
pub struct OcrConfig {
    /// Service endpoint, e.g. `https://my-resource.cognitiveservices.azure.com`.
    pub endpoint: String,

    /// Access key sent as `Ocp-Apim-Subscription-Key`.
    pub api_key: String,

    /// Analysis model. Default: `prebuilt-read`.
    pub model_id: String,

    /// REST API version. Default: `2024-11-30`.
    pub api_version: String,

    /// Delay between status polls when the service gives no `Retry-After`. Default: 1000.
    pub poll_interval_ms: u64,

    /// Upper bound on submit + analysis, in seconds. Default: 120.
    pub timeout_secs: u64,
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder::default()
    }

    /// Read the endpoint and key from `AZURE_DOC_INTEL_ENDPOINT` / `AZURE_DOC_INTEL_KEY`.
    ///
    /// # Errors
    /// [`TriageError::Configuration`] if either variable is unset or blank.
    pub fn from_env() -> Result<Self, TriageError> {
        let mut builder = Self::builder();
        if let Ok(endpoint) = std::env::var(OCR_ENDPOINT_ENV) {
            builder = builder.endpoint(endpoint);
        }
        if let Ok(key) = std::env::var(OCR_KEY_ENV) {
            builder = builder.api_key(key);
        }
        builder.build()
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    model_id: String,
    api_version: String,
    poll_interval_ms: u64,
    timeout_secs: u64,
}

impl Default for OcrConfigBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model_id: "prebuilt-read".to_string(),
            api_version: "2024-11-30".to_string(),
            poll_interval_ms: 1000,
            timeout_secs: 120,
        }
    }
}

impl OcrConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Build the configuration. Both secrets are required.
    pub fn build(self) -> Result<OcrConfig, TriageError> {
        let endpoint = self
            .endpoint
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                TriageError::configuration(
                    "OCR endpoint",
                    format!("Set {OCR_ENDPOINT_ENV} to the document analysis endpoint URL."),
                )
            })?;
        let api_key = self
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TriageError::configuration(
                    "OCR access key",
                    format!("Set {OCR_KEY_ENV} to the document analysis access key."),
                )
            })?;
        if self.timeout_secs == 0 {
            return Err(TriageError::InvalidConfig(
                "OCR timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(OcrConfig {
            endpoint,
            api_key,
            model_id: self.model_id,
            api_version: self.api_version,
            poll_interval_ms: self.poll_interval_ms,
            timeout_secs: self.timeout_secs,
        })
    }
}
