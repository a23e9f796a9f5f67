//! Deterministic pipeline tests.
//!
//! A scripted [`InferenceClient`] routes each call by its prompt (query
//! classification, page summary, search, verification) and an in-memory
//! [`PageExtractor`] stands in for pdfium, so every scenario runs without a
//! network or a PDF library.

use async_trait::async_trait;
use edgequake_pdfqa::output::{GENERIC_FAILURE_MESSAGE, NO_RESULTS_MESSAGE, REJECTION_MESSAGE};
use edgequake_pdfqa::state::find_page;
use edgequake_pdfqa::{
    prompts, Completion, DocumentMetadata, DropReason, ExtractionOutput, InferenceClient,
    InferenceError, Message, PageExtractor, PdfQaError, Pipeline, PipelineConfig,
    PipelineProgressCallback, PipelineRequest, RawPage, Stage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Scripted inference client ────────────────────────────────────────────────

#[derive(Default)]
struct Calls {
    classify: AtomicUsize,
    summary: AtomicUsize,
    search: AtomicUsize,
    verify: AtomicUsize,
}

impl Calls {
    fn total(&self) -> usize {
        self.classify.load(Ordering::SeqCst)
            + self.summary.load(Ordering::SeqCst)
            + self.search.load(Ordering::SeqCst)
            + self.verify.load(Ordering::SeqCst)
    }
}

/// Replies like a well-behaved model:
/// - classification: `classify_reply`
/// - summary: heading is the page's first sentence, three fixed points
/// - search: `search_reply` verbatim
/// - verification: valid iff the claim appears in the page text
struct ScriptedClient {
    classify_reply: String,
    search_reply: String,
    /// Pages (by number) whose summary reply is unreadable.
    bad_summary_pages: Vec<u32>,
    delay: Duration,
    calls: Calls,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedClient {
    fn new(search_reply: &str) -> Self {
        Self {
            classify_reply: "valid".into(),
            search_reply: search_reply.into(),
            bad_summary_pages: Vec::new(),
            delay: Duration::ZERO,
            calls: Calls::default(),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn classify(mut self, reply: &str) -> Self {
        self.classify_reply = reply.into();
        self
    }

    fn bad_summary_on(mut self, page: u32) -> Self {
        self.bad_summary_pages.push(page);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn reply(&self, messages: &[Message]) -> String {
        let system = &messages[0].content;
        let prompt = &messages[messages.len() - 1].content;

        if system == prompts::CLASSIFY_SYSTEM_PROMPT {
            self.calls.classify.fetch_add(1, Ordering::SeqCst);
            return self.classify_reply.clone();
        }

        if prompt.contains("document summarizer") {
            self.calls.summary.fetch_add(1, Ordering::SeqCst);
            let page: u32 = after(prompt, "from page ")
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(0);
            if self.bad_summary_pages.contains(&page) {
                return "I'm unable to summarize this page.".into();
            }
            let text = between(prompt, "\"\"\"\n", "\n\"\"\"");
            let heading = text.split('.').next().unwrap_or("").trim().to_string();
            return serde_json::json!({
                "page_number": page,
                "heading_sentence": format!("{heading}."),
                "key_points": [heading, "A qualitative observation", "A quantitative figure"],
            })
            .to_string();
        }

        if prompt.contains("extract the top") {
            self.calls.search.fetch_add(1, Ordering::SeqCst);
            return self.search_reply.clone();
        }

        if prompt.contains("<claim>") {
            self.calls.verify.fetch_add(1, Ordering::SeqCst);
            let claim = between(prompt, "<claim>\n", "\n</claim>");
            let page = between(prompt, "<page>\n", "\n</page>");
            let valid = page.contains(claim.trim_end_matches('.'));
            let explanation = if valid {
                "The page states this directly."
            } else {
                "The page does not support this figure."
            };
            return serde_json::json!({ "valid": valid, "explanation": explanation }).to_string();
        }

        panic!("unrecognised prompt: {prompt}");
    }
}

fn after<'a>(s: &'a str, marker: &str) -> &'a str {
    s.find(marker).map(|i| &s[i + marker.len()..]).unwrap_or("")
}

fn between<'a>(s: &'a str, open: &str, close: &str) -> &'a str {
    let rest = after(s, open);
    rest.find(close).map(|i| &rest[..i]).unwrap_or(rest)
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, InferenceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let content = self.reply(messages);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Completion {
            content,
            input_tokens: 100,
            output_tokens: 20,
        })
    }
}

/// Fails every call after classification.
struct FailAfterClassify;

#[async_trait]
impl InferenceClient for FailAfterClassify {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, InferenceError> {
        if messages[0].content == prompts::CLASSIFY_SYSTEM_PROMPT {
            Ok(Completion::text("valid"))
        } else {
            Err(InferenceError::Provider("HTTP 500".into()))
        }
    }
}

// ── In-memory extractor ──────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryExtractor {
    documents: HashMap<String, ExtractionOutput>,
    calls: AtomicUsize,
}

impl MemoryExtractor {
    fn with(mut self, path: &str, pages: &[(u32, &str)]) -> Self {
        let output = ExtractionOutput {
            pages: pages.iter().map(|&(n, c)| RawPage::new(n, c)).collect(),
            metadata: DocumentMetadata {
                page_count: pages.len(),
                ..Default::default()
            },
            error: None,
        };
        self.documents.insert(path.to_string(), output);
        self
    }

    fn failing(mut self, path: &str, error: &str) -> Self {
        self.documents
            .insert(path.to_string(), ExtractionOutput::failed(error));
        self
    }
}

#[async_trait]
impl PageExtractor for MemoryExtractor {
    async fn extract(&self, path: &str) -> ExtractionOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(path)
            .cloned()
            .unwrap_or_else(|| ExtractionOutput::failed(format!("no such document: {path}")))
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn reports() -> MemoryExtractor {
    MemoryExtractor::default()
        .with(
            "/docs/annual.pdf",
            &[
                (1, "Revenue grew 20% driven by new product lines. Margins were stable."),
                (2, "Headcount increased to 1,\n250 employees across three regions."),
            ],
        )
        .with(
            "/docs/survey.pdf",
            &[
                (1, "Survey methodology and sampling."),
                (2, "Respondents were drawn from enterprise accounts."),
                (3, "Customer satisfaction rose to 92% this year. Support response times improved."),
            ],
        )
}

const REVENUE_SEARCH: &str = r#"```json
{
  "results": [
    {"claimed_page": 1, "content": "Revenue grew 20% driven by new product lines"},
    {"claimed_page": 3, "content": "Customer satisfaction rose to 92% this year"}
  ]
}
```"#;

fn request(query: &str) -> PipelineRequest {
    PipelineRequest::new(
        vec!["/docs/annual.pdf".into(), "/docs/survey.pdf".into()],
        vec!["annual.pdf".into(), "survey.pdf".into()],
        query,
    )
}

fn pipeline(
    client: Arc<ScriptedClient>,
    extractor: Arc<MemoryExtractor>,
    config: PipelineConfig,
) -> Pipeline {
    Pipeline::new(client, extractor, config)
}

fn default_pipeline(client: Arc<ScriptedClient>) -> (Pipeline, Arc<MemoryExtractor>) {
    let extractor = Arc::new(reports());
    let p = pipeline(client, extractor.clone(), PipelineConfig::default());
    (p, extractor)
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_revenue_and_satisfaction_are_verified_and_cited() {
    let client = Arc::new(ScriptedClient::new(REVENUE_SEARCH));
    let (p, _) = default_pipeline(client.clone());

    let output = p
        .run(&request("What drove revenue growth and customer satisfaction?"))
        .await
        .unwrap();

    assert_eq!(output.final_stage, Stage::Verified);
    assert_eq!(output.messages.len(), 1);
    assert_eq!(
        output.answer(),
        "Verified Results:\n\n\
Revenue grew 20% driven by new product lines\n\
Source: annual.pdf | Page 1\n\
Reasoning: The page states this directly.\n\n\
Customer satisfaction rose to 92% this year\n\
Source: survey.pdf | Page 3\n\
Reasoning: The page states this directly."
    );

    // 1 classify + 5 pages + 1 search + 2 verifications
    assert_eq!(client.calls.classify.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls.summary.load(Ordering::SeqCst), 5);
    assert_eq!(client.calls.search.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls.verify.load(Ordering::SeqCst), 2);
    assert_eq!(output.stats.usage.calls, 9);
    assert_eq!(output.stats.usage.input_tokens, 900);
}

/// Both documents have the relevant point on page 1. The search reply only
/// names a page, so both points go to the first document with a page 1, and
/// the satisfaction point then fails verification against that page.
#[tokio::test]
async fn test_same_page_in_two_documents_attributes_to_first() {
    let extractor = Arc::new(
        MemoryExtractor::default()
            .with(
                "/docs/a.pdf",
                &[(1, "Revenue grew 20% driven by new product lines.")],
            )
            .with(
                "/docs/b.pdf",
                &[(1, "Customer satisfaction rose to 92% this year.")],
            ),
    );
    let search = r#"{"results": [
        {"claimed_page": 1, "content": "Revenue grew 20% driven by new product lines"},
        {"claimed_page": 1, "content": "Customer satisfaction rose to 92% this year"}
    ]}"#;
    let client = Arc::new(ScriptedClient::new(search));
    let p = pipeline(client.clone(), extractor, PipelineConfig::default());

    let output = p
        .run(&PipelineRequest::new(
            vec!["/docs/a.pdf".into(), "/docs/b.pdf".into()],
            vec!["A".into(), "B".into()],
            "revenue growth reasons",
        ))
        .await
        .unwrap();
    let state = &output.state;

    assert_eq!(state.search_results.len(), 2);
    assert!(state.search_results.iter().all(|r| r.document_name == "A"));

    assert_eq!(state.verified_results.len(), 1);
    assert_eq!(
        state.verified_results[0].content,
        "Revenue grew 20% driven by new product lines"
    );
    assert_eq!(state.verified_results[0].source, "A | Page 1");

    assert_eq!(state.dropped_results.len(), 1);
    let dropped = &state.dropped_results[0];
    assert_eq!(dropped.document_name.as_deref(), Some("A"));
    assert_eq!(dropped.claimed_page, 1);
    assert!(matches!(dropped.reason, DropReason::RejectedByVerifier { .. }));

    assert_eq!(client.calls.verify.load(Ordering::SeqCst), 2);
    assert!(output.answer().contains("Source: A | Page 1"));
    assert!(!output.answer().contains("Customer satisfaction"));
    assert!(!output.answer().contains("B | Page"));
}

#[tokio::test]
async fn test_gibberish_query_is_rejected_without_document_work() {
    let client = Arc::new(ScriptedClient::new(REVENUE_SEARCH).classify("gibberish"));
    let (p, extractor) = default_pipeline(client.clone());

    let output = p.run(&request("asdf qwer zxcv")).await.unwrap();

    assert!(output.was_rejected());
    assert_eq!(output.messages, vec![REJECTION_MESSAGE.to_string()]);
    assert_eq!(client.calls.classify.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls.total(), 1);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    assert!(output.state.extracted_pages.is_empty());
    assert!(output.state.summarized_pages.is_empty());
    assert!(!output.state.input_valid);
}

#[tokio::test]
async fn test_blank_query_is_rejected_with_zero_inference_calls() {
    let client = Arc::new(ScriptedClient::new(REVENUE_SEARCH));
    let (p, extractor) = default_pipeline(client.clone());

    let output = p.run(&request("   \n ")).await.unwrap();

    assert_eq!(output.messages, vec![REJECTION_MESSAGE.to_string()]);
    assert_eq!(client.calls.total(), 0);
    assert_eq!(output.stats.usage.calls, 0);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_claim_for_unextracted_page_is_dropped_before_verification() {
    let search = r#"{"results": [
        {"claimed_page": 7, "content": "Profit doubled"},
        {"claimed_page": 2, "content": "Page two point"}
    ]}"#;
    let extractor = Arc::new(MemoryExtractor::default().with(
        "/docs/five.pdf",
        &[
            (1, "One."),
            (2, "Page two point is here."),
            (3, "Three."),
            (4, "Four."),
            (5, "Five."),
        ],
    ));
    let client = Arc::new(ScriptedClient::new(search));
    let p = pipeline(client.clone(), extractor, PipelineConfig::default());

    let output = p
        .run(&PipelineRequest::new(
            vec!["/docs/five.pdf".into()],
            vec!["five.pdf".into()],
            "profit?",
        ))
        .await
        .unwrap();

    assert_eq!(client.calls.verify.load(Ordering::SeqCst), 1);
    assert_eq!(output.state.search_results.len(), 1);
    assert_eq!(output.state.verified_results.len(), 1);
    assert_eq!(output.state.verified_results[0].source, "five.pdf | Page 2");
    assert!(output
        .state
        .dropped_results
        .iter()
        .any(|d| d.reason == DropReason::UnattributedPage { page: 7 }));
    assert!(!output.answer().contains("Profit doubled"));
}

#[tokio::test]
async fn test_every_extracted_page_gets_exactly_one_summary() {
    let client = Arc::new(ScriptedClient::new(REVENUE_SEARCH));
    let (p, _) = default_pipeline(client);

    let output = p.run(&request("revenue?")).await.unwrap();
    let state = &output.state;

    assert_eq!(state.summarized_pages.len(), state.extracted_pages.len());
    for (page, summary) in state.extracted_pages.iter().zip(&state.summarized_pages) {
        assert_eq!(summary.key(), page.key());
        assert_eq!(summary.key_points.len(), 3);
        assert!(!summary.heading_sentence.is_empty());
    }
}

#[tokio::test]
async fn test_verified_results_are_a_subset_of_extracted_search_results() {
    let search = r#"{"results": [
        {"claimed_page": 1, "content": "Revenue grew 20% driven by new product lines"},
        {"claimed_page": 2, "content": "Headcount fell to 900 employees"},
        {"claimed_page": 3, "content": "Customer satisfaction rose to 92% this year"}
    ]}"#;
    let client = Arc::new(ScriptedClient::new(search));
    let (p, _) = default_pipeline(client);

    let output = p.run(&request("revenue?")).await.unwrap();
    let state = &output.state;

    assert_eq!(state.verified_results.len(), 2);
    for v in &state.verified_results {
        let matched = state.search_results.iter().any(|r| {
            v.source == format!("{} | Page {}", r.document_name, r.claimed_page)
                && find_page(&state.extracted_pages, &r.document_name, r.claimed_page).is_some()
        });
        assert!(matched, "{} has no extracted source", v.source);
    }
    assert!(state
        .dropped_results
        .iter()
        .any(|d| matches!(d.reason, DropReason::RejectedByVerifier { .. })));
}

#[tokio::test]
async fn test_identical_inputs_give_identical_results() {
    let first = {
        let (p, _) = default_pipeline(Arc::new(ScriptedClient::new(REVENUE_SEARCH)));
        p.run(&request("revenue?")).await.unwrap()
    };
    let second = {
        let (p, _) = default_pipeline(Arc::new(ScriptedClient::new(REVENUE_SEARCH)));
        p.run(&request("revenue?")).await.unwrap()
    };
    assert_eq!(first.state.verified_results, second.state.verified_results);
    assert_eq!(first.messages, second.messages);
}

#[tokio::test]
async fn test_fan_out_respects_concurrency_bound() {
    let pages: Vec<(u32, String)> = (1..=12).map(|n| (n, format!("Fact number {n}."))).collect();
    let page_refs: Vec<(u32, &str)> = pages.iter().map(|(n, c)| (*n, c.as_str())).collect();
    let extractor = Arc::new(MemoryExtractor::default().with("/docs/long.pdf", &page_refs));
    let client = Arc::new(
        ScriptedClient::new(r#"{"results": []}"#).with_delay(Duration::from_millis(10)),
    );
    let config = PipelineConfig::builder()
        .concurrency(3)
        .max_pages_per_document(12)
        .build()
        .unwrap();
    let p = pipeline(client.clone(), extractor, config);

    let output = p
        .run(&PipelineRequest::from_paths(vec!["/docs/long.pdf".into()], "facts?"))
        .await
        .unwrap();

    assert_eq!(output.state.summarized_pages.len(), 12);
    assert!(client.peak.load(Ordering::SeqCst) <= 3);
    assert!(client.peak.load(Ordering::SeqCst) >= 2);
    // Reassembled in page order despite concurrent completion.
    let numbers: Vec<u32> = output
        .state
        .summarized_pages
        .iter()
        .map(|s| s.page_number)
        .collect();
    assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_zero_verified_results_gives_explicit_message() {
    let client = Arc::new(ScriptedClient::new(r#"{"results": []}"#));
    let (p, _) = default_pipeline(client.clone());

    let output = p.run(&request("anything about dividends?")).await.unwrap();

    assert_eq!(output.final_stage, Stage::Verified);
    assert_eq!(output.answer(), NO_RESULTS_MESSAGE);
    assert_eq!(client.calls.verify.load(Ordering::SeqCst), 0);
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<Stage>>,
    truncated: Mutex<Vec<(String, usize, usize)>>,
    completed: AtomicUsize,
}

impl PipelineProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_truncated(&self, document_name: &str, kept_pages: usize, total_pages: usize) {
        self.truncated
            .lock()
            .unwrap()
            .push((document_name.to_string(), kept_pages, total_pages));
    }

    fn on_pipeline_complete(&self, _verified: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_page_cap_is_surfaced_everywhere() {
    let pages: Vec<(u32, String)> = (1..=14).map(|n| (n, format!("Line {n}."))).collect();
    let page_refs: Vec<(u32, &str)> = pages.iter().map(|(n, c)| (*n, c.as_str())).collect();
    let extractor = Arc::new(MemoryExtractor::default().with("/docs/big.pdf", &page_refs));
    let client = Arc::new(ScriptedClient::new(
        r#"{"results": [{"claimed_page": 2, "content": "Line 2"}]}"#,
    ));
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .max_pages_per_document(10)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let p = pipeline(client.clone(), extractor, config);

    let output = p
        .run(&PipelineRequest::from_paths(vec!["/docs/big.pdf".into()], "line two?"))
        .await
        .unwrap();

    assert_eq!(client.calls.summary.load(Ordering::SeqCst), 10);
    assert_eq!(output.state.truncations.len(), 1);
    assert_eq!(output.state.truncations[0].total_pages, 14);
    assert!(output.answer().contains("'big.pdf' (first 10 of 14 pages)"));
    assert_eq!(
        *recorder.truncated.lock().unwrap(),
        vec![("big.pdf".to_string(), 10, 14)]
    );
}

#[tokio::test]
async fn test_stages_are_visited_in_order() {
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let p = pipeline(
        Arc::new(ScriptedClient::new(REVENUE_SEARCH)),
        Arc::new(reports()),
        config,
    );

    let output = p.run(&request("revenue?")).await.unwrap();

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![
            Stage::Start,
            Stage::InputValidated,
            Stage::PdfExtracted,
            Stage::Summarized,
            Stage::Searched,
            Stage::Verified,
        ]
    );
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
    let timed: Vec<Stage> = output.stats.stage_durations_ms.iter().map(|(s, _)| *s).collect();
    assert_eq!(timed.len(), 6);
}

#[tokio::test]
async fn test_rejected_run_visits_rejection_stage() {
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let p = pipeline(
        Arc::new(ScriptedClient::new(REVENUE_SEARCH).classify("gibberish")),
        Arc::new(reports()),
        config,
    );

    p.run(&request("zzzz")).await.unwrap();

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![Stage::Start, Stage::InputValidated, Stage::Rejected]
    );
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unreadable_summary_fails_the_run() {
    let client = Arc::new(ScriptedClient::new(REVENUE_SEARCH).bad_summary_on(2));
    let (p, _) = default_pipeline(client.clone());

    let err = p.run(&request("revenue?")).await.unwrap_err();
    assert!(matches!(err, PdfQaError::SummaryParse { page: 2, .. }), "got: {err}");
    assert_eq!(client.calls.search.load(Ordering::SeqCst), 0);

    let messages = p
        .respond(
            vec!["/docs/annual.pdf".into()],
            vec!["annual.pdf".into()],
            "revenue?",
        )
        .await;
    assert_eq!(messages, vec![GENERIC_FAILURE_MESSAGE.to_string()]);
}

#[tokio::test]
async fn test_unreadable_search_reply_fails_the_run() {
    let client = Arc::new(ScriptedClient::new("The most relevant page is page 1."));
    let (p, _) = default_pipeline(client.clone());

    let err = p.run(&request("revenue?")).await.unwrap_err();
    assert!(matches!(err, PdfQaError::SearchParse { .. }), "got: {err}");
    assert_eq!(client.calls.verify.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_inference_failure_fails_the_run() {
    let p = Pipeline::new(
        Arc::new(FailAfterClassify),
        Arc::new(reports()),
        PipelineConfig::default(),
    );
    let err = p.run(&request("revenue?")).await.unwrap_err();
    assert!(matches!(
        err,
        PdfQaError::Inference {
            step: "page summarization",
            ..
        }
    ));
}

#[tokio::test]
async fn test_missing_and_mismatched_documents() {
    let (p, extractor) = default_pipeline(Arc::new(ScriptedClient::new(REVENUE_SEARCH)));

    let err = p
        .run(&PipelineRequest::new(vec![], vec![], "revenue?"))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfQaError::MissingDocuments));

    let err = p
        .run(&PipelineRequest::new(
            vec!["/docs/annual.pdf".into()],
            vec![],
            "revenue?",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfQaError::DocumentCountMismatch { paths: 1, names: 0 }));
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_extraction_error_is_fatal() {
    let extractor = Arc::new(reports().failing("/docs/broken.pdf", "corrupt xref table"));
    let p = pipeline(
        Arc::new(ScriptedClient::new(REVENUE_SEARCH)),
        extractor,
        PipelineConfig::default(),
    );

    let err = p
        .run(&PipelineRequest::new(
            vec!["/docs/annual.pdf".into(), "/docs/broken.pdf".into()],
            vec!["annual.pdf".into(), "broken.pdf".into()],
            "revenue?",
        ))
        .await
        .unwrap_err();
    assert!(
        matches!(err, PdfQaError::ExtractionFailed { ref document, .. } if document == "broken.pdf"),
        "got: {err}"
    );
}

#[tokio::test]
async fn test_all_blank_pages_is_an_error() {
    let extractor = Arc::new(MemoryExtractor::default().with("/docs/scan.pdf", &[(1, " "), (2, "\n")]));
    let client = Arc::new(ScriptedClient::new(REVENUE_SEARCH));
    let p = pipeline(client.clone(), extractor, PipelineConfig::default());

    let err = p
        .run(&PipelineRequest::from_paths(vec!["/docs/scan.pdf".into()], "revenue?"))
        .await
        .unwrap_err();
    assert!(matches!(err, PdfQaError::NoExtractablePages { documents: 1 }));
    assert_eq!(client.calls.summary.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicate_document_names_are_disambiguated() {
    let extractor = Arc::new(
        MemoryExtractor::default()
            .with("/a/report.pdf", &[(1, "Alpha revenue was 10.")])
            .with("/b/report.pdf", &[(1, "Beta revenue was 20.")]),
    );
    let client = Arc::new(ScriptedClient::new(r#"{"results": []}"#));
    let p = pipeline(client, extractor, PipelineConfig::default());

    let output = p
        .run(&PipelineRequest::from_paths(
            vec!["/a/report.pdf".into(), "/b/report.pdf".into()],
            "revenue?",
        ))
        .await
        .unwrap();

    let names: Vec<&str> = output
        .state
        .extracted_pages
        .iter()
        .map(|p| p.document_name.as_str())
        .collect();
    assert_eq!(names, vec!["report.pdf", "report.pdf (2)"]);
}

#[test]
fn test_pipeline_runs_under_block_on() {
    let (p, _) = default_pipeline(Arc::new(ScriptedClient::new(REVENUE_SEARCH)));
    let output = tokio_test::block_on(p.run(&request("revenue?"))).unwrap();
    assert_eq!(output.state.verified_results.len(), 2);
}
