//! Pipeline state machine.
//!
//! ```text
//! Start ──▶ InputValidated ──accepted──▶ PdfExtracted ──▶ Summarized ──▶ Searched ──▶ Verified ──▶ End
//!                 │
//!                 └──rejected──▶ Rejected ──▶ End
//! ```
//!
//! A [`Stage`] names what has already happened; the work that moves the run
//! forward happens on the edges. [`transition`] is a pure function so the
//! routing can be tested without a model or a PDF.

use crate::error::PdfQaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Start,
    InputValidated,
    PdfExtracted,
    Summarized,
    Searched,
    Verified,
    Rejected,
    End,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        self == Stage::End
    }

    /// Human-readable name of the work done on the edge leaving this stage.
    pub fn next_step(self) -> &'static str {
        match self {
            Stage::Start => "input validation",
            Stage::InputValidated => "text extraction",
            Stage::PdfExtracted => "page summarization",
            Stage::Summarized => "cross-page search",
            Stage::Searched => "result verification",
            Stage::Verified => "answer formatting",
            Stage::Rejected => "rejection",
            Stage::End => "none",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::InputValidated => "input_validated",
            Stage::PdfExtracted => "pdf_extracted",
            Stage::Summarized => "summarized",
            Stage::Searched => "searched",
            Stage::Verified => "verified",
            Stage::Rejected => "rejected",
            Stage::End => "end",
        };
        f.write_str(name)
    }
}

/// Result of the work done while leaving a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The step finished; take the only outgoing edge.
    Done,
    /// The query was classified as answerable.
    Accepted,
    /// The query was blank or classified as gibberish.
    Rejected,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Done => "done",
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// The pipeline's only routing rule: `(stage, outcome) -> next stage`.
pub fn transition(from: Stage, outcome: Outcome) -> Result<Stage, PdfQaError> {
    use Outcome::*;
    use Stage::*;

    let next = match (from, outcome) {
        (Start, Done) => InputValidated,
        (InputValidated, Accepted) => PdfExtracted,
        (InputValidated, Outcome::Rejected) => Stage::Rejected,
        (PdfExtracted, Done) => Summarized,
        (Summarized, Done) => Searched,
        (Searched, Done) => Verified,
        (Verified, Done) => End,
        (Stage::Rejected, Done) => End,
        _ => {
            return Err(PdfQaError::InvalidTransition {
                from: from.to_string(),
                outcome: outcome.to_string(),
            })
        }
    };
    Ok(next)
}
