//! Output types and the final answer formatting.
//!
//! The user-facing reply of a run is a list of assistant messages, always
//! exactly one in practice. [`PipelineOutput`] carries that list together
//! with the final [`PipelineState`] and run statistics for callers that want
//! to inspect what happened.

use crate::graph::Stage;
use crate::inference::Usage;
use crate::state::{PipelineState, Truncation, VerifiedResult};
use serde::{Deserialize, Serialize};

/// Shown when the run fails for any reason. The cause is logged, never shown.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred processing your request. Please try again.";

/// Shown when the query is blank or classified as gibberish.
pub const REJECTION_MESSAGE: &str = "I'm sorry, I couldn't understand your request. \
Please rephrase your question about the uploaded documents and try again.";

/// Shown instead of a result list when nothing survived verification.
pub const NO_RESULTS_MESSAGE: &str =
    "No verified results were found in the uploaded documents for this query.";

/// Heading of a successful answer.
pub const RESULTS_HEADING: &str = "Verified Results:";

/// Result of a completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Assistant messages to show the user.
    pub messages: Vec<String>,

    /// Final state, including dropped results and truncations.
    pub state: PipelineState,

    /// Stage the run ended in before `End`: `Verified` or `Rejected`.
    pub final_stage: Stage,

    /// Run statistics.
    pub stats: PipelineStats,
}

impl PipelineOutput {
    /// The single user-facing answer.
    pub fn answer(&self) -> &str {
        self.messages.last().map(String::as_str).unwrap_or_default()
    }

    pub fn was_rejected(&self) -> bool {
        self.final_stage == Stage::Rejected
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Inference calls and tokens, across every stage.
    pub usage: Usage,

    /// Pages with text across all documents, after the per-document cap.
    pub extracted_pages: usize,

    pub summarized_pages: usize,

    /// Results returned by the searcher, after enrichment.
    pub search_results: usize,

    pub verified_results: usize,

    /// Results removed by enrichment or verification.
    pub dropped_results: usize,

    /// Wall-clock time spent on the edge leaving each stage, in order.
    pub stage_durations_ms: Vec<(Stage, u64)>,

    /// Total wall-clock time in milliseconds.
    pub total_duration_ms: u64,
}

/// Render verified results as the final assistant message.
///
/// Each result becomes `"{content}\nSource: {source}\nReasoning: {explanation}"`
/// and results are joined by a blank line, in the order given. When nothing
/// survived, an explicit no-results sentence replaces the list. Documents cut
/// short by the page cap are named in a trailing note.
pub fn format_verified_results(results: &[VerifiedResult], truncations: &[Truncation]) -> String {
    let mut out = if results.is_empty() {
        NO_RESULTS_MESSAGE.to_string()
    } else {
        let body = results
            .iter()
            .map(format_result)
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("{RESULTS_HEADING}\n\n{body}")
    };

    if !truncations.is_empty() {
        out.push_str("\n\n");
        out.push_str(&truncation_note(truncations));
    }
    out
}

fn format_result(r: &VerifiedResult) -> String {
    format!(
        "{}\nSource: {}\nReasoning: {}",
        r.content, r.source, r.explanation
    )
}

fn truncation_note(truncations: &[Truncation]) -> String {
    let parts = truncations
        .iter()
        .map(|t| {
            format!(
                "'{}' (first {} of {} pages)",
                t.document_name, t.kept_pages, t.total_pages
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("Note: only part of some documents was analysed: {parts}.")
}
