//! Page summarization: one inference call per extracted page, fanned out.

use crate::error::PdfQaError;
use crate::inference::{InferenceClient, Message};
use crate::pipeline::fanout::fan_out;
use crate::pipeline::parse::parse_page_summary;
use crate::progress::ProgressCallback;
use crate::prompts;
use crate::state::{ExtractedPage, SummarizedPage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

const STEP: &str = "page summarization";

/// Summarize every page, at most `concurrency` calls at a time.
///
/// Output has one entry per input page, in input order. Each page is
/// summarized from its own text only. The first page whose call fails or
/// whose reply cannot be decoded fails the whole stage.
pub async fn summarize_pages(
    client: &dyn InferenceClient,
    pages: &[ExtractedPage],
    concurrency: usize,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<SummarizedPage>, PdfQaError> {
    let total = pages.len();
    let done = AtomicUsize::new(0);
    let start = Instant::now();
    info!("Summarizing {} pages (concurrency={})", total, concurrency);

    if let Some(cb) = progress {
        cb.on_summarization_start(total);
    }

    let summaries = fan_out(pages, concurrency, |_, page| {
        let done = &done;
        async move {
            let summary = summarize_page(client, page).await?;
            let n = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(cb) = progress {
                cb.on_page_summarized(&page.document_name, page.page_number, n, total);
            }
            Ok::<_, PdfQaError>(summary)
        }
    })
    .await?;

    info!("Summarized {} pages in {:?}", summaries.len(), start.elapsed());
    Ok(summaries)
}

/// Summarize a single page.
pub async fn summarize_page(
    client: &dyn InferenceClient,
    page: &ExtractedPage,
) -> Result<SummarizedPage, PdfQaError> {
    let messages = [
        Message::system(prompts::JSON_SYSTEM_PROMPT),
        Message::user(prompts::summary_prompt(
            &page.document_name,
            page.page_number,
            &page.content,
        )),
    ];

    let reply = client
        .complete(&messages)
        .await
        .map_err(|e| PdfQaError::inference(STEP, e))?;

    let parsed = parse_page_summary(&reply.content).map_err(|e| {
        warn!(
            "Unreadable summary for '{}' page {}: {}",
            page.document_name, page.page_number, e
        );
        PdfQaError::SummaryParse {
            document: page.document_name.clone(),
            page: page.page_number,
            detail: e.to_string(),
        }
    })?;

    match parsed.page_number {
        Some(echoed) if echoed == page.page_number => {}
        Some(echoed) => debug!(
            "Model echoed page {} for '{}' page {}; keeping the source page",
            echoed, page.document_name, page.page_number
        ),
        None => debug!(
            "No usable page number in summary of '{}' page {}; keeping the source page",
            page.document_name, page.page_number
        ),
    }

    Ok(SummarizedPage {
        document_name: page.document_name.clone(),
        page_number: page.page_number,
        heading_sentence: parsed.heading_sentence,
        key_points: parsed.key_points,
    })
}
