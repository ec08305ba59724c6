use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::{FailedSummary, PipelineError, Summary, SummaryBatch};
use crate::gemini::LanguageModel;
use crate::retrieve::RetrievedDocument;

/// Documents summarized per question.
pub const SUMMARY_LIMIT: usize = 4;
/// In-flight summarization calls.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Summarizes one document in 2-3 sentences.
pub async fn summarize(
    model: &impl LanguageModel,
    doc: &RetrievedDocument,
) -> Result<Summary, PipelineError> {
    let text = doc.text.trim();
    if text.is_empty() {
        return Err(PipelineError::EmptyDocument {
            origin: doc.source.clone(),
        });
    }

    let summary = model
        .prompt(&format!("Summarize in 2-3 sentences:\n\n{text}"))
        .await?;

    Ok(Summary {
        source: doc.source.clone(),
        text: summary.trim().to_string(),
    })
}

/// Summarizes the first `limit` documents with at most `concurrency` calls in flight.
///
/// A document whose summary fails is reported in `failed` and skipped. Fails
/// only when the model failed for every document; documents that are merely
/// empty yield an empty batch instead.
pub async fn summarize_all(
    model: &impl LanguageModel,
    docs: &[RetrievedDocument],
    limit: usize,
    concurrency: usize,
) -> Result<SummaryBatch, PipelineError> {
    let mut outcomes: Vec<_> = stream::iter(docs.iter().take(limit).enumerate())
        .map(|(position, doc)| async move { (position, doc, summarize(model, doc).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    // completion order is arbitrary; restore retrieval order
    outcomes.sort_by_key(|(position, _, _)| *position);

    let mut batch = SummaryBatch::default();
    let mut model_failures = 0;

    for (_, doc, outcome) in outcomes {
        match outcome {
            Ok(summary) => batch.summaries.push(summary),
            Err(e) => {
                if !matches!(e, PipelineError::EmptyDocument { .. }) {
                    model_failures += 1;
                }
                warn!(source = %doc.source, error = %e, "skipping document");
                batch.failed.push(FailedSummary {
                    source: doc.source.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if batch.summaries.is_empty() && model_failures > 0 {
        return Err(PipelineError::AllSummariesFailed {
            failures: batch.failed.len(),
        });
    }

    debug!(
        summaries = batch.summaries.len(),
        failed = batch.failed.len(),
        "summarization complete"
    );
    Ok(batch)
}
