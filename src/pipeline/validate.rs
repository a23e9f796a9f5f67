//! Input validation: screen the query before any document work starts.

use crate::error::PdfQaError;
use crate::inference::{InferenceClient, Message};
use crate::pipeline::parse::{parse_input_classification, InputClassification};
use crate::prompts;
use tracing::{debug, info};

const STEP: &str = "input validation";

/// The validator's decision for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputVerdict {
    /// The query, trimmed.
    pub query: String,
    /// `false` when the classifier said anything other than `valid`.
    pub valid: bool,
}

/// Classify `query` as answerable or gibberish with one inference call.
///
/// A blank query is [`PdfQaError::EmptyInput`] and costs no call. Gibberish
/// is a routing outcome, returned as `valid: false`, never an error.
pub async fn validate_input(
    client: &dyn InferenceClient,
    query: &str,
) -> Result<InputVerdict, PdfQaError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PdfQaError::EmptyInput);
    }

    let messages = [
        Message::system(prompts::CLASSIFY_SYSTEM_PROMPT),
        Message::user(prompts::classify_prompt(query)),
    ];
    let reply = client
        .complete(&messages)
        .await
        .map_err(|e| PdfQaError::inference(STEP, e))?;

    let classification = parse_input_classification(&reply.content);
    debug!("Classifier replied {:?} → {:?}", reply.content.trim(), classification);

    let valid = classification == InputClassification::Valid;
    if !valid {
        info!("Query rejected as gibberish");
    }
    Ok(InputVerdict {
        query: query.to_string(),
        valid,
    })
}
