//! Prompts for every inference step of the pipeline.
//!
//! Each stage owns one builder here and nothing else constructs prompt text.
//! The JSON shapes quoted in the `*_FORMAT` constants are the contract the
//! structured parser in [`crate::pipeline::parse`] enforces; change them
//! together.

use crate::state::SummarizedPage;

/// System turn shared by every structured (JSON) step.
pub const JSON_SYSTEM_PROMPT: &str = "You are a careful financial and market research assistant. \
You answer only with valid JSON matching the structure you are given. \
Do not wrap the JSON in commentary.";

/// Binary query classification. The reply must be the single word `valid` or `gibberish`.
pub const CLASSIFY_SYSTEM_PROMPT: &str = r#"You screen questions sent to a document analysis assistant.

Decide whether the user's message is a meaningful request for information that could be answered from business documents (reports, filings, market studies).

Reply with exactly one lowercase word and nothing else:
- valid     — the message is an understandable question or instruction, even if short or vague
- gibberish — random characters, keyboard mashing, or text with no discernible request"#;

/// JSON shape for one page summary.
pub const SUMMARY_FORMAT: &str = r#"{
  "page_number": <integer, the page number given above>,
  "heading_sentence": "<one sentence summarizing the main idea of the page>",
  "key_points": ["<point 1>", "<point 2>", "<point 3>"]
}"#;

/// JSON shape for the search result list.
pub const SEARCH_FORMAT: &str = r#"{
  "results": [
    {
      "claimed_page": <integer, the single page the point comes from>,
      "content": "<the relevant information, stated as in the summary>"
    }
  ]
}"#;

/// JSON shape for a verification verdict.
pub const VERIFICATION_FORMAT: &str = r#"{
  "valid": <true if the claim is fully supported by the page, otherwise false>,
  "explanation": "<one or two sentences explaining why>"
}"#;

/// Classification request for the user's query.
pub fn classify_prompt(query: &str) -> String {
    format!("User message:\n\"\"\"{query}\"\"\"\n\nAnswer with `valid` or `gibberish`.")
}

/// Summarize one page into a heading sentence plus three key points.
pub fn summary_prompt(document_name: &str, page_number: u32, content: &str) -> String {
    format!(
        "You are an advanced document summarizer. Summarize the following content from page \
{page_number} of the document '{document_name}'. Your summary must have exactly one heading \
sentence and exactly three key points. At least one point must be qualitative and at least one \
must be quantitative (quote figures exactly as written). Each point should state a significant \
fact or insight concisely.\n\n\
\"\"\"\n{content}\n\"\"\"\n\n\
Respond with valid JSON using this structure:\n{SUMMARY_FORMAT}"
    )
}

/// Render every summary as one labelled block, in the order given.
pub fn summaries_block(summaries: &[SummarizedPage]) -> String {
    summaries
        .iter()
        .map(|s| {
            format!(
                "Document: {} | Page {}:\n\
- Heading Sentence: {}\n\
- Key Points:\n  1. {}\n  2. {}\n  3. {}",
                s.document_name,
                s.page_number,
                s.heading_sentence,
                s.key_points[0],
                s.key_points[1],
                s.key_points[2]
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Ask for the most relevant points across all summaries.
pub fn search_prompt(summaries: &[SummarizedPage], query: &str, top_n: usize) -> String {
    format!(
        "The following are summaries of pages from multiple documents:\n\n\
{block}\n\n\
Based on the query: \"{query}\", extract the top {top_n} points relevant to the query from the \
summaries. Each point must be attributed to exactly one page number as its source; never cite \
a range or several pages for one point. Return fewer points if fewer are relevant.\n\n\
Respond with valid JSON using this structure:\n{SEARCH_FORMAT}",
        block = summaries_block(summaries),
    )
}

/// Ask whether a claim is grounded in the raw text of its claimed page.
///
/// The claim and page text are fenced in `<claim>` / `<page>` tags so the
/// model cannot confuse one for the other.
pub fn verification_prompt(document_name: &str, page_number: u32, claim: &str, page_text: &str) -> String {
    format!(
        "Does the following claim originate from the content of page {page_number} in the \
document '{document_name}'?\n\n\
<claim>\n{claim}\n</claim>\n\n\
<page>\n{page_text}\n</page>\n\n\
Check the following:\n\
- Does every number in the claim match the page exactly?\n\
- Are qualitative descriptions consistent with and supported by the page?\n\
- Is anything in the claim absent from the page (hallucinated)?\n\n\
Respond with valid JSON using this structure:\n{VERIFICATION_FORMAT}"
    )
}
