//! Configuration types for a pipeline run.
//!
//! Every knob lives in [`PipelineConfig`], built via
//! [`PipelineConfigBuilder`]. The two bounds that keep a run cheap and
//! predictable are explicit here rather than library defaults:
//! [`PipelineConfig::concurrency`] caps in-flight inference calls per fan-out,
//! and [`PipelineConfig::max_pages_per_document`] caps how many pages of each
//! document are summarized.

use crate::error::PdfQaError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Upper limit accepted by [`PipelineConfigBuilder::concurrency`].
pub const MAX_CONCURRENCY: usize = 64;

/// Configuration for a question-answering run.
///
/// # Example
/// ```rust
/// use edgequake_pdfqa::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .concurrency(4)
///     .max_pages_per_document(20)
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Maximum concurrent inference calls within one fan-out
    /// (page summaries, result verifications). Default: 10.
    ///
    /// Inference calls are network-bound; a handful in flight cuts wall-clock
    /// time roughly linearly. Lower it if the provider returns `429`s.
    pub concurrency: usize,

    /// Pages summarized per document, counted from the first page. Default: 10.
    ///
    /// Pages past the cap are not summarized and cannot be cited. The run
    /// records a [`crate::state::Truncation`] and says so in the answer.
    pub max_pages_per_document: usize,

    /// How many relevant points the searcher is asked for. Default: 10.
    pub max_search_results: usize,

    /// LLM model identifier, e.g. "gpt-4o-mini". If None, uses the default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Verification wants the model to be literal about numbers; keep it low.
    pub temperature: f32,

    /// Maximum tokens generated per inference call. Default: 2048.
    pub max_tokens: usize,

    /// Per-inference-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives stage and per-item events while the run progresses.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_pages_per_document: 10,
            max_search_results: 10,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 2048,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("concurrency", &self.concurrency)
            .field("max_pages_per_document", &self.max_pages_per_document)
            .field("max_search_results", &self.max_search_results)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn max_pages_per_document(mut self, n: usize) -> Self {
        self.config.max_pages_per_document = n.max(1);
        self
    }

    pub fn max_search_results(mut self, n: usize) -> Self {
        self.config.max_search_results = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PdfQaError> {
        let c = &self.config;
        if c.concurrency == 0 || c.concurrency > MAX_CONCURRENCY {
            return Err(PdfQaError::InvalidConfig(format!(
                "Concurrency must be 1–{MAX_CONCURRENCY}, got {}",
                c.concurrency
            )));
        }
        if c.max_tokens < 64 {
            return Err(PdfQaError::InvalidConfig(format!(
                "max_tokens must be ≥ 64 to fit a structured reply, got {}",
                c.max_tokens
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(PdfQaError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
