//! Result verification: check every search result against its source page.
//!
//! Each result is compared with the normalized raw text of the page it
//! claims to come from. Only results the model confirms survive; everything
//! else is dropped with a [`DropReason`] and a `warn!` line. A result whose
//! page was never extracted is dropped before any call is made.

use crate::error::{DropReason, PdfQaError};
use crate::inference::{InferenceClient, Message};
use crate::pipeline::fanout::fan_out;
use crate::pipeline::normalize::normalize_text;
use crate::pipeline::parse::parse_verification;
use crate::progress::ProgressCallback;
use crate::prompts;
use crate::state::{find_page, source_tag, DroppedResult, ExtractedPage, SearchResult, VerifiedResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

const STEP: &str = "result verification";

/// Verified results plus everything that was dropped, both in search order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub verified: Vec<VerifiedResult>,
    pub dropped: Vec<DroppedResult>,
}

enum Checked {
    Verified(VerifiedResult),
    Dropped(DroppedResult),
}

/// Verify every result, at most `concurrency` calls at a time.
///
/// Zero survivors is a success. An inference failure on any result fails the
/// stage; a reply that cannot be decoded only drops that result.
pub async fn verify_results(
    client: &dyn InferenceClient,
    results: &[SearchResult],
    pages: &[ExtractedPage],
    concurrency: usize,
    progress: Option<&ProgressCallback>,
) -> Result<VerificationOutcome, PdfQaError> {
    let total = results.len();
    let done = AtomicUsize::new(0);
    let start = Instant::now();
    info!("Verifying {} results (concurrency={})", total, concurrency);

    if let Some(cb) = progress {
        cb.on_verification_start(total);
    }

    let checked = fan_out(results, concurrency, |_, result| {
        let done = &done;
        async move {
            let checked = verify_one(client, result, pages).await?;
            let n = done.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(cb) = progress {
                cb.on_result_verified(n, total, matches!(checked, Checked::Verified(_)));
            }
            Ok::<_, PdfQaError>(checked)
        }
    })
    .await?;

    let mut outcome = VerificationOutcome::default();
    for c in checked {
        match c {
            Checked::Verified(v) => outcome.verified.push(v),
            Checked::Dropped(d) => outcome.dropped.push(d),
        }
    }

    info!(
        "Verified {}/{} results in {:?}",
        outcome.verified.len(),
        total,
        start.elapsed()
    );
    Ok(outcome)
}

async fn verify_one(
    client: &dyn InferenceClient,
    result: &SearchResult,
    pages: &[ExtractedPage],
) -> Result<Checked, PdfQaError> {
    let dropped = |reason: DropReason| {
        warn!(
            "Dropping result for '{}' page {}: {}",
            result.document_name, result.claimed_page, reason
        );
        Checked::Dropped(DroppedResult {
            document_name: Some(result.document_name.clone()),
            claimed_page: result.claimed_page,
            content: result.content.clone(),
            reason,
        })
    };

    let Some(page) = find_page(pages, &result.document_name, result.claimed_page) else {
        return Ok(dropped(DropReason::PageNotExtracted {
            document: result.document_name.clone(),
            page: result.claimed_page,
        }));
    };

    let page_text = normalize_text(&page.content);
    let messages = [
        Message::system(prompts::JSON_SYSTEM_PROMPT),
        Message::user(prompts::verification_prompt(
            &result.document_name,
            result.claimed_page,
            &result.content,
            &page_text,
        )),
    ];
    let reply = client
        .complete(&messages)
        .await
        .map_err(|e| PdfQaError::inference(STEP, e))?;

    let verdict = match parse_verification(&reply.content) {
        Ok(v) => v,
        Err(e) => {
            return Ok(dropped(DropReason::VerificationParse {
                detail: e.to_string(),
            }))
        }
    };

    if !verdict.valid {
        return Ok(dropped(DropReason::RejectedByVerifier {
            explanation: verdict.explanation,
        }));
    }

    debug!(
        "Verified result for '{}' page {}",
        result.document_name, result.claimed_page
    );
    Ok(Checked::Verified(VerifiedResult {
        content: normalize_text(&result.content),
        source: source_tag(&result.document_name, result.claimed_page),
        explanation: verdict.explanation,
    }))
}
