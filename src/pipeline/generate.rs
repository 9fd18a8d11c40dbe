//! The text-generation seam between the pipeline and an AI backend.
//!
//! Enhancement only needs "prompt in, text out", so that is all
//! [`TextGenerator`] asks for. Production code wraps an edgequake-llm
//! provider in [`LlmGenerator`]; tests plug in a scripted fake and never touch
//! the network.

use crate::config::{StudyConfig, DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL};
use crate::error::LecSlideError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Failure reported by a backend: transport, quota, auth, etc.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Produces free text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// [`TextGenerator`] backed by an edgequake-llm chat provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &StudyConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
        }
    }

    /// Resolve a provider from the configuration and environment.
    pub fn from_config(config: &StudyConfig) -> Result<Self, LecSlideError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| BackendError(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

fn build_options(config: &StudyConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, LecSlideError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        LecSlideError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`).
/// 2. **Named provider** (`config.provider_name` + `config.model`).
/// 3. **`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`**, when both are set.
/// 4. **`GEMINI_API_KEY`**, the default backend for study materials.
/// 5. **`OPENAI_API_KEY`**.
/// 6. **`ProviderFactory::from_env`** for anything else the factory knows.
pub fn resolve_provider(config: &StudyConfig) -> Result<Arc<dyn LLMProvider>, LecSlideError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let default_model = if name.eq_ignore_ascii_case("gemini") {
            DEFAULT_GEMINI_MODEL
        } else {
            DEFAULT_OPENAI_MODEL
        };
        let model = config.model.as_deref().unwrap_or(default_model);
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (
        non_empty_env("EDGEQUAKE_LLM_PROVIDER"),
        non_empty_env("EDGEQUAKE_MODEL"),
    ) {
        return create_provider(&prov, &model);
    }

    if non_empty_env("GEMINI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        return create_provider("gemini", model);
    }

    if non_empty_env("OPENAI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| LecSlideError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY or OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
