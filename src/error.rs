//! Error types for the edgequake-pdfqa library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfQaError`] — **Fatal**: the pipeline run cannot produce an answer
//!   (no documents, a page summary that cannot be decoded, an inference call
//!   that failed). Returned as `Err(PdfQaError)` from [`crate::run_pipeline`]
//!   and [`crate::Pipeline::run`].
//!
//! * [`DropReason`] — **Non-fatal**: a single search result was removed
//!   before it reached the answer (unknown page, verifier said no, verifier
//!   reply unreadable). Stored in [`crate::state::DroppedResult`] so operators
//!   can see what was discarded while the user only sees the surviving
//!   results.
//!
//! Neither type is ever shown verbatim to the end user. Callers that talk to
//! users go through [`PdfQaError::user_message`], which collapses every fatal
//! error into one generic sentence.

use crate::inference::InferenceError;
use crate::output::GENERIC_FAILURE_MESSAGE;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfqa library.
#[derive(Debug, Error)]
pub enum PdfQaError {
    // ── Request errors ────────────────────────────────────────────────────
    /// No documents were supplied with the request.
    #[error("No documents supplied: at least one PDF is required")]
    MissingDocuments,

    /// `document_paths` and `document_names` are not parallel lists.
    #[error("Got {paths} document paths but {names} document names")]
    DocumentCountMismatch { paths: usize, names: usize },

    /// The query is blank after trimming.
    ///
    /// The orchestrator turns this into the rejection path; it only escapes
    /// when the input validator is called directly.
    #[error("User query is empty")]
    EmptyInput,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The page extractor reported an error for a document.
    #[error("Failed to extract text from '{document}': {detail}")]
    ExtractionFailed { document: String, detail: String },

    /// Every page of every document was blank (or nothing was extracted).
    #[error("No extractable text found in {documents} document(s)")]
    NoExtractablePages { documents: usize },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// A page summary could not be decoded into the expected schema.
    #[error("Could not parse summary for '{document}' page {page}: {detail}")]
    SummaryParse {
        document: String,
        page: u32,
        detail: String,
    },

    /// The search response could not be decoded into the expected schema.
    #[error("Could not parse search results: {detail}")]
    SearchParse { detail: String },

    /// An inference call failed; the enclosing stage is aborted.
    #[error("Inference call failed during {step}: {source}")]
    Inference {
        step: &'static str,
        #[source]
        source: InferenceError,
    },

    // ── Provider / config errors ──────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Orchestration errors ──────────────────────────────────────────────
    /// The state machine was asked for an edge that does not exist.
    #[error("Invalid pipeline transition from {from} on {outcome}")]
    InvalidTransition { from: String, outcome: String },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfQaError {
    /// The only text an end user ever sees for a failed run.
    ///
    /// The underlying cause is kept on the error for operator diagnostics.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }

    /// Wrap an inference failure with the name of the step it happened in.
    pub(crate) fn inference(step: &'static str, source: InferenceError) -> Self {
        PdfQaError::Inference { step, source }
    }
}

/// Why a search result did not make it into the verified answer.
///
/// Stored alongside the dropped result; never surfaced to the end user.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DropReason {
    /// No summarized page carries the claimed page number.
    #[error("claimed page {page} matches no summarized page")]
    UnattributedPage { page: u32 },

    /// The enriched (document, page) pair has no extracted page to check against.
    #[error("'{document}' page {page} was not extracted")]
    PageNotExtracted { document: String, page: u32 },

    /// The verifier looked at the page and said the claim is not supported.
    #[error("verifier rejected the claim: {explanation}")]
    RejectedByVerifier { explanation: String },

    /// The verifier's reply could not be decoded.
    #[error("verification reply unreadable: {detail}")]
    VerificationParse { detail: String },
}
