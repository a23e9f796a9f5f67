//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages and fans out over pages and
//! search results.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfqa::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for PageCounter {
//!     fn on_page_summarized(&self, document_name: &str, page: u32, done: usize, total: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{document_name} p.{page} ({done}/{total})");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(PageCounter { pages: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::graph::Stage;
use std::sync::Arc;

/// Called by the pipeline as it runs.
///
/// Implementations must be `Send + Sync`: per-page and per-result events
/// arrive from concurrent tasks, in completion order. All methods default to
/// no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called when the run enters `stage`.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once extraction is merged, before summarization starts.
    ///
    /// # Arguments
    /// * `pages` — number of pages that will be summarized
    fn on_summarization_start(&self, pages: usize) {
        let _ = pages;
    }

    /// Called when a page summary has been parsed.
    ///
    /// `done` counts completions so far, not the page's position.
    fn on_page_summarized(&self, document_name: &str, page: u32, done: usize, total: usize) {
        let _ = (document_name, page, done, total);
    }

    /// Called once the searcher's results are enriched, before verification.
    fn on_verification_start(&self, results: usize) {
        let _ = results;
    }

    /// Called when one search result has been checked.
    fn on_result_verified(&self, done: usize, total: usize, accepted: bool) {
        let _ = (done, total, accepted);
    }

    /// Called when a document had more pages than the per-document cap.
    fn on_truncated(&self, document_name: &str, kept_pages: usize, total_pages: usize) {
        let _ = (document_name, kept_pages, total_pages);
    }

    /// Called once when the run reaches its terminal stage.
    ///
    /// `verified` is 0 for rejected queries.
    fn on_pipeline_complete(&self, verified: usize) {
        let _ = verified;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
