//! # edgequake-pdfqa
//!
//! Ask questions about PDF documents and get back only answers that were
//! checked against the page they cite.
//!
//! ## Why this crate?
//!
//! A language model asked "what drove revenue growth?" over a stack of
//! reports will happily invent a figure or cite the wrong page. This crate
//! never shows the model's first answer. Every page is summarized on its own,
//! a single search call picks the relevant points across all summaries, and
//! each point is then re-read against the raw text of the page it claims to
//! come from. Only points the verifier confirms reach the user, each with a
//! `document | Page N` citation and the verifier's reasoning.
//!
//! ## Pipeline Overview
//!
//! ```text
//! query + PDFs
//!  │
//!  ├─ 1. Validate   blank / gibberish queries are rejected (1 call)
//!  ├─ 2. Extract    per-page text via pdfium, capped per document
//!  ├─ 3. Summarize  heading + 3 key points per page (N calls, bounded)
//!  ├─ 4. Search     top points across all summaries (1 call)
//!  ├─ 5. Verify     each point vs. its page's raw text (M calls, bounded)
//!  └─ 6. Answer     "Verified Results:" with source and reasoning
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfqa::{run_pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = PipelineConfig::default();
//!     let messages = run_pipeline(
//!         vec!["reports/q3.pdf".into()],
//!         vec!["q3.pdf".into()],
//!         "What drove revenue growth?",
//!         &config,
//!     )
//!     .await?;
//!     println!("{}", messages.join("\n"));
//!     Ok(())
//! }
//! ```
//!
//! Use [`Pipeline`] directly to inject your own [`InferenceClient`] or
//! [`PageExtractor`], or to get the full [`PipelineOutput`] (final state,
//! dropped results, token usage).
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfqa` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdfqa = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod inference;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod state;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{DropReason, PdfQaError};
pub use extract::{DocumentMetadata, ExtractionOutput, PageExtractor, PdfiumExtractor, RawPage};
pub use graph::{transition, Outcome, Stage};
pub use inference::{Completion, InferenceClient, InferenceError, Message, ProviderClient, Role, Usage};
pub use orchestrator::{run_pipeline, run_pipeline_sync, Pipeline, PipelineRequest};
pub use output::{PipelineOutput, PipelineStats};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use state::{PipelineState, SearchResult, SummarizedPage, VerifiedResult};
