//! Data model threaded through one pipeline run.
//!
//! [`PipelineState`] is created fresh per request, owned by exactly one run,
//! and handed back inside [`crate::output::PipelineOutput`] when the run ends.
//! Stages read from it and return new values; only the orchestrator writes.

use crate::error::DropReason;
use crate::inference::Message;
use serde::{Deserialize, Serialize};

/// Identity of a page across the whole run: `(document_name, page_number)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    pub document_name: String,
    pub page_number: u32,
}

impl PageKey {
    pub fn new(document_name: impl Into<String>, page_number: u32) -> Self {
        Self {
            document_name: document_name.into(),
            page_number,
        }
    }
}

/// Raw text of one page, as produced by the page extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub document_name: String,
    pub page_number: u32,
    pub content: String,
}

impl ExtractedPage {
    pub fn key(&self) -> PageKey {
        PageKey::new(self.document_name.clone(), self.page_number)
    }
}

/// Heading sentence and three key points for one extracted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizedPage {
    pub document_name: String,
    pub page_number: u32,
    pub heading_sentence: String,
    pub key_points: [String; 3],
}

impl SummarizedPage {
    pub fn key(&self) -> PageKey {
        PageKey::new(self.document_name.clone(), self.page_number)
    }
}

/// A relevant point attributed to one page, after document enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_name: String,
    pub claimed_page: u32,
    pub content: String,
}

/// A search result the verifier confirmed against its source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedResult {
    pub content: String,
    /// `"{document_name} | Page {claimed_page}"`.
    pub source: String,
    pub explanation: String,
}

/// Build the citation tag shown under each verified result.
pub fn source_tag(document_name: &str, page: u32) -> String {
    format!("{document_name} | Page {page}")
}

/// A document that had more pages than the per-document cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    pub document_name: String,
    pub kept_pages: usize,
    pub total_pages: usize,
}

/// A search result that was removed before the answer, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedResult {
    /// `None` when the result could not even be attributed to a document.
    pub document_name: Option<String>,
    pub claimed_page: u32,
    pub content: String,
    pub reason: DropReason,
}

/// Mutable record shared by every stage of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Chat turns, append-only.
    pub messages: Vec<Message>,
    /// One entry per uploaded document.
    pub document_paths: Vec<String>,
    /// Parallel to `document_paths`; unique after disambiguation.
    pub document_names: Vec<String>,
    /// Set once by the input validator.
    pub query: String,
    /// Set once by the input validator.
    pub input_valid: bool,
    pub extracted_pages: Vec<ExtractedPage>,
    pub summarized_pages: Vec<SummarizedPage>,
    pub search_results: Vec<SearchResult>,
    pub verified_results: Vec<VerifiedResult>,
    pub truncations: Vec<Truncation>,
    pub dropped_results: Vec<DroppedResult>,
}

impl PipelineState {
    /// Fresh state for one request. Callers validate list lengths first.
    pub fn new(document_paths: Vec<String>, document_names: Vec<String>, query: &str) -> Self {
        Self {
            messages: vec![Message::user(query)],
            document_paths,
            document_names: disambiguate_names(document_names),
            ..Default::default()
        }
    }

    /// Content of the most recent user turn, if any.
    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::inference::Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Look up the extracted page for a `(document, page)` pair.
pub fn find_page<'a>(
    pages: &'a [ExtractedPage],
    document_name: &str,
    page_number: u32,
) -> Option<&'a ExtractedPage> {
    pages
        .iter()
        .find(|p| p.page_number == page_number && p.document_name == document_name)
}

/// Suffix repeated document names with ` (2)`, ` (3)`, ... so page keys stay unique.
pub fn disambiguate_names(names: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{name} ({n})");
            n += 1;
        }
        seen.push(candidate);
    }
    seen
}
