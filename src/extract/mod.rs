//! Page extraction: turn a document path into ordered per-page text.
//!
//! The pipeline only depends on the [`PageExtractor`] trait. The default
//! implementation, [`PdfiumExtractor`], reads the PDF text layer with
//! pdfium (no OCR); tests substitute an in-memory extractor.
//!
//! Extraction reports failure through [`ExtractionOutput::error`] rather than
//! a `Result`, so an extractor can hand back metadata (and whatever pages it
//! managed to read) alongside the error. The orchestrator treats any error as
//! fatal for the run.

pub mod pdfium;
pub mod source;

pub use self::pdfium::PdfiumExtractor;

use crate::error::PdfQaError;
use crate::state::{ExtractedPage, Truncation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Text of one page as extracted, before it is tied to a document name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPage {
    /// 1-based physical page number.
    pub page_number: u32,
    pub content: String,
}

impl RawPage {
    pub fn new(page_number: u32, content: impl Into<String>) -> Self {
        Self {
            page_number,
            content: content.into(),
        }
    }
}

/// Document-level metadata extracted from the PDF info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Everything an extractor returns for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Pages in physical order.
    pub pages: Vec<RawPage>,
    pub metadata: DocumentMetadata,
    /// Set when extraction failed; `pages` may then be partial or empty.
    pub error: Option<String>,
}

impl ExtractionOutput {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Produces per-page text for a document.
///
/// `Send + Sync` because documents are extracted from async tasks.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, path: &str) -> ExtractionOutput;
}

/// Why a document could not be read.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("PDF '{path}' is encrypted and requires a password")]
    PasswordRequired { path: PathBuf },

    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    #[error("Text extraction failed for page {page}: {detail}")]
    PageTextFailed { page: u32, detail: String },

    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Pages of one document, ready to be added to the pipeline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    pub pages: Vec<ExtractedPage>,
    /// Set when the document had more pages than `max_pages`.
    pub truncation: Option<Truncation>,
}

/// Attach `document_name` to the extractor's pages, applying the page cap.
///
/// The cap keeps the first `max_pages` pages in physical order. Blank pages
/// are skipped after capping. Repeated page numbers keep the first copy.
/// A non-empty `output.error` becomes [`PdfQaError::ExtractionFailed`].
pub fn merge_document(
    document_name: &str,
    output: ExtractionOutput,
    max_pages: usize,
) -> Result<MergedDocument, PdfQaError> {
    if let Some(detail) = output.error {
        return Err(PdfQaError::ExtractionFailed {
            document: document_name.to_string(),
            detail,
        });
    }

    let mut raw = output.pages;
    raw.sort_by_key(|p| p.page_number);
    raw.dedup_by_key(|p| p.page_number);

    let total_pages = raw.len().max(output.metadata.page_count);
    let truncation = if total_pages > max_pages {
        warn!(
            "'{}' has {} pages; only the first {} will be analysed",
            document_name, total_pages, max_pages
        );
        raw.truncate(max_pages);
        Some(Truncation {
            document_name: document_name.to_string(),
            kept_pages: raw.len(),
            total_pages,
        })
    } else {
        None
    };

    let pages = raw
        .into_iter()
        .filter(|p| {
            let blank = p.content.trim().is_empty();
            if blank {
                debug!("Skipping blank page {} of '{}'", p.page_number, document_name);
            }
            !blank && p.page_number > 0
        })
        .map(|p| ExtractedPage {
            document_name: document_name.to_string(),
            page_number: p.page_number,
            content: p.content,
        })
        .collect();

    Ok(MergedDocument { pages, truncation })
}
