//! Inference client: the one seam between the pipeline and a language model.
//!
//! Every stage talks to the model through [`InferenceClient`] and nothing
//! else. The trait is deliberately tiny (messages in, text out) so tests can
//! script replies without a network, and so the pipeline never reaches for a
//! process-wide client.
//!
//! [`ProviderClient`] is the production implementation. It wraps any
//! `edgequake-llm` [`LLMProvider`] and applies the per-call timeout from
//! [`PipelineConfig::api_timeout_secs`]. There is no retry loop here: a failed
//! call fails its stage, and the orchestrator surfaces one pipeline error.

use crate::config::PipelineConfig;
use crate::error::PdfQaError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role/content chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generated text plus token accounting for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    /// A completion with no usage figures, handy for stubs.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Why an inference call produced no text.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// The provider returned an error (HTTP failure, auth, rate limit, ...).
    #[error("provider error: {0}")]
    Provider(String),

    /// No reply within the configured per-call timeout.
    #[error("no reply within {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered with an empty body.
    #[error("provider returned an empty reply")]
    EmptyReply,
}

/// A text-completion service.
///
/// Implementations must be `Send + Sync`: fan-out stages issue several calls
/// at once against the same client.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send the conversation and return the model's reply.
    async fn complete(&self, messages: &[Message]) -> Result<Completion, InferenceError>;
}

#[async_trait]
impl<C: InferenceClient + ?Sized> InferenceClient for Arc<C> {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, InferenceError> {
        (**self).complete(messages).await
    }
}

// ── edgequake-llm backed client ──────────────────────────────────────────

/// [`InferenceClient`] over an `edgequake-llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    /// Resolve a provider from the config / environment and wrap it.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PdfQaError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl InferenceClient for ProviderClient {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, InferenceError> {
        let chat: Vec<ChatMessage> = messages.iter().map(to_chat_message).collect();
        let start = Instant::now();

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&chat, Some(&self.options)))
            .await
            .map_err(|_| InferenceError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| InferenceError::Provider(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(InferenceError::EmptyReply);
        }

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        Role::System => ChatMessage::system(message.content.as_str()),
        Role::User => ChatMessage::user(message.content.as_str()),
        Role::Assistant => ChatMessage::assistant(message.content.as_str()),
    }
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PdfQaError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PdfQaError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI key present** → OpenAI with the configured or default model.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, PdfQaError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PdfQaError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

// ── Usage metering ───────────────────────────────────────────────────────

/// Call and token totals for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub calls: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Counts calls and tokens flowing through an inner client.
pub struct MeteredClient<'a> {
    inner: &'a dyn InferenceClient,
    calls: AtomicUsize,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl<'a> MeteredClient<'a> {
    pub fn new(inner: &'a dyn InferenceClient) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
        }
    }

    pub fn usage(&self) -> Usage {
        Usage {
            calls: self.calls.load(Ordering::SeqCst),
            input_tokens: self.input_tokens.load(Ordering::SeqCst),
            output_tokens: self.output_tokens.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl InferenceClient for MeteredClient<'_> {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let completion = self.inner.complete(messages).await?;
        self.input_tokens
            .fetch_add(completion.input_tokens, Ordering::SeqCst);
        self.output_tokens
            .fetch_add(completion.output_tokens, Ordering::SeqCst);
        Ok(completion)
    }
}
