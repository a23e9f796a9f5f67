//! Pipeline orchestration: drive one request through the state machine.
//!
//! [`Pipeline::run`] owns a fresh [`PipelineState`] per request and walks it
//! through [`graph::transition`] until `End`. Every stage reads from the state
//! and returns values; only this module writes them back. Any stage error
//! aborts the run with a single [`PdfQaError`]; nothing is retried.
//!
//! All inference goes through one [`MeteredClient`] per run so the returned
//! [`PipelineStats`] can report calls and tokens.

use crate::config::PipelineConfig;
use crate::error::PdfQaError;
use crate::extract::{merge_document, source, PageExtractor, PdfiumExtractor};
use crate::graph::{self, Outcome, Stage};
use crate::inference::{InferenceClient, Message, MeteredClient, ProviderClient};
use crate::output::{
    format_verified_results, PipelineOutput, PipelineStats, GENERIC_FAILURE_MESSAGE,
    REJECTION_MESSAGE,
};
use crate::pipeline::fanout::fan_out;
use crate::pipeline::{search, summarize, validate, verify};
use crate::progress::ProgressCallback;
use crate::state::PipelineState;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// One question about one set of documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    /// Local paths or `http(s)` URLs, one per document.
    pub document_paths: Vec<String>,
    /// Display names, parallel to `document_paths`.
    pub document_names: Vec<String>,
    pub query: String,
}

impl PipelineRequest {
    pub fn new(
        document_paths: Vec<String>,
        document_names: Vec<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            document_paths,
            document_names,
            query: query.into(),
        }
    }

    /// Build a request naming each document after its file name.
    pub fn from_paths(document_paths: Vec<String>, query: impl Into<String>) -> Self {
        let document_names = document_paths.iter().map(|p| source::document_name(p)).collect();
        Self::new(document_paths, document_names, query)
    }

    fn check(&self) -> Result<(), PdfQaError> {
        if self.document_paths.len() != self.document_names.len() {
            return Err(PdfQaError::DocumentCountMismatch {
                paths: self.document_paths.len(),
                names: self.document_names.len(),
            });
        }
        if self.document_paths.is_empty() {
            return Err(PdfQaError::MissingDocuments);
        }
        Ok(())
    }
}

/// A configured pipeline: inference client, page extractor, and settings.
///
/// Cheap to share between requests; each [`Pipeline::run`] call gets its own
/// state.
pub struct Pipeline {
    client: Arc<dyn InferenceClient>,
    extractor: Arc<dyn PageExtractor>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        extractor: Arc<dyn PageExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            extractor,
            config,
        }
    }

    /// Build the production pipeline: an `edgequake-llm` provider resolved
    /// from `config` / the environment, and the pdfium extractor.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PdfQaError> {
        let client = ProviderClient::from_config(&config)?;
        let extractor =
            PdfiumExtractor::new(config.password.clone(), config.download_timeout_secs);
        Ok(Self::new(Arc::new(client), Arc::new(extractor), config))
    }

    /// Answer one request.
    ///
    /// # Returns
    /// `Ok(PipelineOutput)` for both answered and rejected queries (check
    /// [`PipelineOutput::was_rejected`]); zero verified results is also `Ok`.
    ///
    /// # Errors
    /// Missing or mismatched documents, an extraction failure, an unreadable
    /// summary or search reply, or any failed inference call.
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineOutput, PdfQaError> {
        match self.execute(request).await {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("Pipeline failed: {}", e);
                Err(e)
            }
        }
    }

    /// Answer one request, folding every failure into the generic message.
    ///
    /// This is the chat-facing entry point: it always returns exactly one
    /// assistant message and never exposes an error's cause.
    pub async fn respond(
        &self,
        document_paths: Vec<String>,
        document_names: Vec<String>,
        query: &str,
    ) -> Vec<String> {
        let request = PipelineRequest::new(document_paths, document_names, query);
        match self.run(&request).await {
            Ok(output) => output.messages,
            Err(e) => vec![e.user_message().to_string()],
        }
    }

    async fn execute(&self, request: &PipelineRequest) -> Result<PipelineOutput, PdfQaError> {
        request.check()?;

        let total_start = Instant::now();
        let metered = MeteredClient::new(self.client.as_ref());
        let progress = self.config.progress_callback.as_ref();
        let mut state = PipelineState::new(
            request.document_paths.clone(),
            request.document_names.clone(),
            &request.query,
        );
        let mut stats = PipelineStats::default();
        let mut final_stage = Stage::Start;
        let mut stage = Stage::Start;

        info!(
            "Starting pipeline: {} document(s), concurrency={}",
            state.document_paths.len(),
            self.config.concurrency
        );

        while !stage.is_terminal() {
            if let Some(cb) = progress {
                cb.on_stage_start(stage);
            }
            let step_start = Instant::now();
            debug!("Stage {}: {}", stage, stage.next_step());

            let outcome = match stage {
                Stage::Start => {
                    self.validate_input(&metered, &mut state).await?;
                    Outcome::Done
                }
                Stage::InputValidated if !state.input_valid => Outcome::Rejected,
                Stage::InputValidated => {
                    self.extract_documents(&mut state, progress).await?;
                    Outcome::Accepted
                }
                Stage::PdfExtracted => {
                    state.summarized_pages = summarize::summarize_pages(
                        &metered,
                        &state.extracted_pages,
                        self.config.concurrency,
                        progress,
                    )
                    .await?;
                    Outcome::Done
                }
                Stage::Summarized => {
                    let found = search::search_summaries(
                        &metered,
                        &state.summarized_pages,
                        &state.query,
                        self.config.max_search_results,
                    )
                    .await?;
                    state.search_results = found.results;
                    state.dropped_results.extend(found.dropped);
                    Outcome::Done
                }
                Stage::Searched => {
                    let checked = verify::verify_results(
                        &metered,
                        &state.search_results,
                        &state.extracted_pages,
                        self.config.concurrency,
                        progress,
                    )
                    .await?;
                    state.verified_results = checked.verified;
                    state.dropped_results.extend(checked.dropped);
                    Outcome::Done
                }
                Stage::Verified => {
                    let answer =
                        format_verified_results(&state.verified_results, &state.truncations);
                    state.messages.push(Message::assistant(answer));
                    final_stage = Stage::Verified;
                    Outcome::Done
                }
                Stage::Rejected => {
                    state.messages.push(Message::assistant(REJECTION_MESSAGE));
                    final_stage = Stage::Rejected;
                    Outcome::Done
                }
                Stage::End => break,
            };

            stats
                .stage_durations_ms
                .push((stage, step_start.elapsed().as_millis() as u64));
            stage = graph::transition(stage, outcome)?;
        }

        stats.usage = metered.usage();
        stats.extracted_pages = state.extracted_pages.len();
        stats.summarized_pages = state.summarized_pages.len();
        stats.search_results = state.search_results.len();
        stats.verified_results = state.verified_results.len();
        stats.dropped_results = state.dropped_results.len();
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        if let Some(cb) = progress {
            cb.on_pipeline_complete(state.verified_results.len());
        }
        info!(
            "Pipeline finished ({}): {} verified result(s), {} inference call(s), {}ms",
            final_stage,
            stats.verified_results,
            stats.usage.calls,
            stats.total_duration_ms
        );

        let messages = state
            .messages
            .last()
            .map(|m| vec![m.content.clone()])
            .unwrap_or_else(|| vec![GENERIC_FAILURE_MESSAGE.to_string()]);

        Ok(PipelineOutput {
            messages,
            state,
            final_stage,
            stats,
        })
    }

    /// Classify the latest user turn. A blank query takes the rejection path
    /// without an inference call.
    async fn validate_input(
        &self,
        client: &dyn InferenceClient,
        state: &mut PipelineState,
    ) -> Result<(), PdfQaError> {
        let query = state.latest_user_message().unwrap_or_default().to_string();
        match validate::validate_input(client, &query).await {
            Ok(verdict) => {
                state.query = verdict.query;
                state.input_valid = verdict.valid;
            }
            Err(PdfQaError::EmptyInput) => {
                info!("Query is blank; rejecting without inference");
                state.query = String::new();
                state.input_valid = false;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Extract every document and merge the pages into the state.
    async fn extract_documents(
        &self,
        state: &mut PipelineState,
        progress: Option<&ProgressCallback>,
    ) -> Result<(), PdfQaError> {
        let start = Instant::now();
        let extractor = self.extractor.as_ref();
        let documents = state.document_paths.iter().zip(&state.document_names);

        let outputs = fan_out(documents, self.config.concurrency, |_, (path, name)| async move {
            debug!("Extracting '{}' from {}", name, path);
            Ok::<_, PdfQaError>((name.clone(), extractor.extract(path).await))
        })
        .await?;

        let mut pages = Vec::new();
        let mut truncations = Vec::new();
        for (name, output) in outputs {
            let merged = merge_document(&name, output, self.config.max_pages_per_document)?;
            if let Some(t) = merged.truncation {
                if let Some(cb) = progress {
                    cb.on_truncated(&t.document_name, t.kept_pages, t.total_pages);
                }
                truncations.push(t);
            }
            pages.extend(merged.pages);
        }

        if pages.is_empty() {
            warn!("No page of any document has extractable text");
            return Err(PdfQaError::NoExtractablePages {
                documents: state.document_paths.len(),
            });
        }

        info!(
            "Extracted {} pages from {} document(s) in {:?}",
            pages.len(),
            state.document_paths.len(),
            start.elapsed()
        );
        state.extracted_pages = pages;
        state.truncations = truncations;
        Ok(())
    }
}

/// Answer `query` against the given documents with a pipeline built from `config`.
///
/// # Returns
/// The assistant messages for the user: the formatted verified results, or
/// the rejection message for a blank or unintelligible query.
pub async fn run_pipeline(
    document_paths: Vec<String>,
    document_names: Vec<String>,
    query: &str,
    config: &PipelineConfig,
) -> Result<Vec<String>, PdfQaError> {
    let pipeline = Pipeline::from_config(config.clone())?;
    let request = PipelineRequest::new(document_paths, document_names, query);
    Ok(pipeline.run(&request).await?.messages)
}

/// Synchronous wrapper around [`run_pipeline`].
///
/// Creates a temporary tokio runtime. Do not call from inside an existing
/// tokio runtime; use [`run_pipeline`] there.
pub fn run_pipeline_sync(
    document_paths: Vec<String>,
    document_names: Vec<String>,
    query: &str,
    config: &PipelineConfig,
) -> Result<Vec<String>, PdfQaError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfQaError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_pipeline(document_paths, document_names, query, config))
}
