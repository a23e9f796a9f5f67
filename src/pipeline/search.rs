//! Cross-page search: one inference call over every summary at once.

use crate::error::{DropReason, PdfQaError};
use crate::inference::{InferenceClient, Message};
use crate::pipeline::parse::{parse_search_results, ClaimedPoint};
use crate::prompts;
use crate::state::{DroppedResult, SearchResult, SummarizedPage};
use std::time::Instant;
use tracing::{debug, info, warn};

const STEP: &str = "cross-page search";

/// Search results that could be attributed, plus the ones that could not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub dropped: Vec<DroppedResult>,
}

/// Ask for the `top_n` points most relevant to `query` across all summaries.
///
/// An undecodable reply is [`PdfQaError::SearchParse`]. Points whose claimed
/// page matches no summary are dropped, not errors.
pub async fn search_summaries(
    client: &dyn InferenceClient,
    summaries: &[SummarizedPage],
    query: &str,
    top_n: usize,
) -> Result<SearchOutcome, PdfQaError> {
    if summaries.is_empty() {
        return Ok(SearchOutcome::default());
    }

    let start = Instant::now();
    let messages = [
        Message::system(prompts::JSON_SYSTEM_PROMPT),
        Message::user(prompts::search_prompt(summaries, query, top_n)),
    ];
    let reply = client
        .complete(&messages)
        .await
        .map_err(|e| PdfQaError::inference(STEP, e))?;

    let mut points = parse_search_results(&reply.content).map_err(|e| {
        warn!("Unreadable search reply: {}", e);
        PdfQaError::SearchParse {
            detail: e.to_string(),
        }
    })?;

    if points.len() > top_n {
        debug!("Searcher returned {} points, keeping {}", points.len(), top_n);
        points.truncate(top_n);
    }

    let outcome = attribute_points(points, summaries);
    info!(
        "Search found {} attributable points ({} dropped) in {:?}",
        outcome.results.len(),
        outcome.dropped.len(),
        start.elapsed()
    );
    Ok(outcome)
}

/// Attach a document name to each point.
///
/// A point is attributed to the FIRST summary, in summary order, whose page
/// number equals the claimed page. With several documents sharing page
/// numbers this picks the earliest document.
pub fn attribute_points(points: Vec<ClaimedPoint>, summaries: &[SummarizedPage]) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();
    for point in points {
        match summaries.iter().find(|s| s.page_number == point.claimed_page) {
            Some(summary) => outcome.results.push(SearchResult {
                document_name: summary.document_name.clone(),
                claimed_page: point.claimed_page,
                content: point.content,
            }),
            None => {
                warn!(
                    "Dropping search result for page {}: no such summarized page",
                    point.claimed_page
                );
                outcome.dropped.push(DroppedResult {
                    document_name: None,
                    claimed_page: point.claimed_page,
                    content: point.content,
                    reason: DropReason::UnattributedPage {
                        page: point.claimed_page,
                    },
                });
            }
        }
    }
    outcome
}
