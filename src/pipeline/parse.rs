//! Structured response parsing: decode and validate every model reply.
//!
//! Models are asked for JSON, but they still wrap it in ```` ```json ````
//! fences, prefix it with a sentence, or drop a field. Every decoder here
//! first isolates the JSON block, then deserializes into a raw serde shape,
//! then checks the invariants serde cannot express (exactly three key
//! points, non-empty heading, positive page numbers). Anything that fails is
//! a [`ParseError`]; no decoder ever fills in a missing value.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Why a model reply could not be turned into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No `{...}` or `[...]` block anywhere in the reply.
    #[error("no JSON found in reply")]
    NoJson,

    /// The block was found but is not valid JSON for the expected shape.
    #[error("invalid JSON: {0}")]
    Json(String),

    /// The JSON decoded but violates a field constraint.
    #[error("{0}")]
    Schema(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::Json(e.to_string())
    }
}

/// Every plausible JSON payload in a model reply, most likely first.
///
/// A ```` ```json ```` fenced block wins outright, then any fenced block that
/// holds an object or array. Otherwise both the `{ ... }` span and the
/// `[ ... ]` span (first opener to last closer) are offered, in the order
/// they start, so a prose citation like `[1]` ahead of the real object does
/// not hide it.
pub fn json_candidates(text: &str) -> Vec<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        let end = body.find("```").unwrap_or(body.len());
        return non_empty(body[..end].trim()).into_iter().collect();
    }

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        // Skip an info string such as ```JSON or ```javascript.
        let body = after.find('\n').map(|i| &after[i + 1..]).unwrap_or(after);
        let end = body.find("```").unwrap_or(body.len());
        if let Some(block) = non_empty(body[..end].trim()) {
            if block.starts_with('{') || block.starts_with('[') {
                return vec![block];
            }
        }
    }

    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (end > start).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, span)| span).collect()
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Decode the first candidate that fits `T`; report the first candidate's
/// error when none does.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let mut first_error = None;
    for block in json_candidates(text) {
        match serde_json::from_str(block) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.map_or(ParseError::NoJson, ParseError::from))
}

/// Read a page number given as a JSON integer or a digit-only string.
fn page_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    page_from_value(&value)
        .ok_or_else(|| de::Error::custom(format!("expected a page number, got {value}")))
}

// ── Page summary ─────────────────────────────────────────────────────────

/// A decoded page summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    /// Page number the model echoed back, if it was readable and positive.
    /// The summarizer keys on the page it asked about, not on this value.
    pub page_number: Option<u32>,
    pub heading_sentence: String,
    pub key_points: [String; 3],
}

#[derive(Deserialize)]
struct RawPageSummary {
    #[serde(default)]
    page_number: Option<Value>,
    heading_sentence: String,
    key_points: Vec<String>,
}

pub fn parse_page_summary(text: &str) -> Result<PageSummary, ParseError> {
    let raw: RawPageSummary = decode(text)?;

    let heading_sentence = raw.heading_sentence.trim().to_string();
    if heading_sentence.is_empty() {
        return Err(ParseError::Schema("heading_sentence is empty".into()));
    }

    let count = raw.key_points.len();
    let key_points: [String; 3] = raw
        .key_points
        .into_iter()
        .map(|p| p.trim().to_string())
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|_| ParseError::Schema(format!("expected exactly 3 key_points, got {count}")))?;
    if key_points.iter().any(String::is_empty) {
        return Err(ParseError::Schema("key_points contains an empty entry".into()));
    }

    Ok(PageSummary {
        page_number: raw
            .page_number
            .as_ref()
            .and_then(page_from_value)
            .filter(|&n| n > 0),
        heading_sentence,
        key_points,
    })
}

// ── Search results ───────────────────────────────────────────────────────

/// A relevant point as returned by the searcher, before document enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClaimedPoint {
    #[serde(deserialize_with = "lenient_page")]
    pub claimed_page: u32,
    pub content: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSearchResults {
    Wrapped { results: Vec<ClaimedPoint> },
    Bare(Vec<ClaimedPoint>),
}

/// Decode the searcher's reply. An empty list is valid.
pub fn parse_search_results(text: &str) -> Result<Vec<ClaimedPoint>, ParseError> {
    let raw: RawSearchResults = decode(text)?;
    let points = match raw {
        RawSearchResults::Wrapped { results } => results,
        RawSearchResults::Bare(results) => results,
    };

    points
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            if p.claimed_page == 0 {
                return Err(ParseError::Schema(format!(
                    "result {i}: claimed_page must be positive"
                )));
            }
            p.content = p.content.trim().to_string();
            if p.content.is_empty() {
                return Err(ParseError::Schema(format!("result {i}: content is empty")));
            }
            Ok(p)
        })
        .collect()
}

// ── Verification verdict ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerificationVerdict {
    pub valid: bool,
    #[serde(default)]
    pub explanation: String,
}

pub fn parse_verification(text: &str) -> Result<VerificationVerdict, ParseError> {
    let mut verdict: VerificationVerdict = decode(text)?;
    verdict.explanation = verdict.explanation.trim().to_string();
    if verdict.valid && verdict.explanation.is_empty() {
        return Err(ParseError::Schema(
            "explanation is required for a valid claim".into(),
        ));
    }
    Ok(verdict)
}

// ── Input classification ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClassification {
    Valid,
    Gibberish,
}

/// Read the classifier's one-word reply.
///
/// Only a reply that literally says `valid` (ignoring case, quotes, and
/// trailing punctuation) counts as valid; everything else is gibberish.
pub fn parse_input_classification(text: &str) -> InputClassification {
    let word = text
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
        .trim_end_matches(['.', '!'])
        .trim()
        .to_ascii_lowercase();
    if word == "valid" {
        InputClassification::Valid
    } else {
        InputClassification::Gibberish
    }
}
