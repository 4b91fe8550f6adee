//! Language-model interaction: one system + one user message in, raw text out.
//!
//! The agents never talk to a provider directly. They build a
//! [`CompletionRequest`] and hand it to a [`ModelBackend`]: either an
//! `edgequake-llm` provider or a test stub.
//!
//! No retry: a backend failure surfaces to the caller immediately as
//! [`TriageError::ModelBackend`]. The only guard is a per-call timeout.

use crate::config::TriageConfig;
use crate::error::{BackendError, TriageError};
use crate::output::ModelMetadata;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Everything a backend needs to produce one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier, recorded for provenance.
    pub model: String,
    pub system: String,
    /// The single user message (document text embedded).
    pub user: String,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

/// A text-generation service.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Return the model's full reply text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "model"
    }
}

/// [`ModelBackend`] over an `edgequake-llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl ModelBackend for ProviderBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];
        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::Request(format!("{}", e)))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Fixed per-agent settings captured at construction.
#[derive(Debug, Clone)]
pub(crate) struct AgentSettings {
    pub agent: &'static str,
    pub model: String,
    pub prompt_version: String,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl AgentSettings {
    pub fn new(agent: &'static str, config: &TriageConfig, max_tokens: usize) -> Self {
        Self {
            agent,
            model: config.model.clone(),
            prompt_version: config.prompt_version.clone(),
            max_tokens,
            temperature: config.temperature,
            timeout_secs: config.api_timeout_secs,
        }
    }

    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            model: self.model.clone(),
            prompt_version: self.prompt_version.clone(),
        }
    }

    pub fn request(&self, system: &str, user: String) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system: system.to_string(),
            user,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub async fn complete(
        &self,
        backend: &dyn ModelBackend,
        request: &CompletionRequest,
    ) -> Result<String, TriageError> {
        complete_with_timeout(backend, request, self.timeout_secs, self.agent).await
    }
}

/// Resolve the model backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`): used as-is.
/// 2. **Pre-built provider** (`config.provider`): wrapped in a
///    [`ProviderBackend`].
/// 3. **Named provider + model**: [`ProviderFactory::create_llm_provider`]
///    reads the provider's API key from the environment.
///
/// # Errors
/// [`TriageError::Configuration`] when the provider cannot be created
/// (typically a missing API key).
pub fn resolve_backend(config: &TriageConfig) -> Result<Arc<dyn ModelBackend>, TriageError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderBackend::new(
            Arc::clone(provider),
            config.model.clone(),
        )));
    }

    let provider = ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
        .map_err(|e| {
            TriageError::configuration(
                format!("LLM provider '{}'", config.provider_name),
                format!(
                    "Set the provider's API key (e.g. ANTHROPIC_API_KEY) or choose another \
                     provider with --provider.\nError: {e}"
                ),
            )
        })?;

    Ok(Arc::new(ProviderBackend::new(
        provider,
        format!("{}/{}", config.provider_name, config.model),
    )))
}

/// Run one completion under `timeout_secs`, wrapping every failure for `agent`.
pub async fn complete_with_timeout(
    backend: &dyn ModelBackend,
    request: &CompletionRequest,
    timeout_secs: u64,
    agent: &'static str,
) -> Result<String, TriageError> {
    let start = Instant::now();
    let outcome =
        tokio::time::timeout(Duration::from_secs(timeout_secs), backend.complete(request)).await;

    match outcome {
        Ok(Ok(text)) => {
            debug!(
                "{agent}: {} replied with {} chars in {:?}",
                backend.name(),
                text.len(),
                start.elapsed()
            );
            Ok(text)
        }
        Ok(Err(source)) => {
            warn!("{agent}: {} failed: {}", backend.name(), source);
            Err(TriageError::ModelBackend { agent, source })
        }
        Err(_) => {
            warn!("{agent}: {} timed out after {}s", backend.name(), timeout_secs);
            Err(TriageError::ModelTimeout {
                agent,
                secs: timeout_secs,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ModelBackend for Echo {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
            Ok(request.user.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl ModelBackend for Broken {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
            Err(BackendError::Auth("bad key".into()))
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            system: "sys".into(),
            user: "hello".into(),
            max_tokens: 10,
            temperature: None,
        }
    }

    #[test]
    fn configured_backend_takes_priority() {
        let backend: Arc<dyn ModelBackend> = Arc::new(Echo);
        let config = TriageConfig::builder().backend(backend).build().unwrap();
        let resolved = resolve_backend(&config).unwrap();
        assert_eq!(resolved.name(), "model");
    }

    #[tokio::test]
    async fn successful_call_returns_text() {
        let text = complete_with_timeout(&Echo, &request(), 5, "classifier")
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn backend_failure_is_wrapped() {
        let err = complete_with_timeout(&Broken, &request(), 5, "invoice extractor")
            .await
            .unwrap_err();
        match err {
            TriageError::ModelBackend { agent, source } => {
                assert_eq!(agent, "invoice extractor");
                assert_eq!(source, BackendError::Auth("bad key".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
