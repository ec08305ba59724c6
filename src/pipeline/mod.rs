//! The rewrite → retrieve → summarize → synthesize stages and the report they produce.

pub(crate) mod report;
pub(crate) mod rewrite;
pub(crate) mod summarize;
pub(crate) mod synthesize;

pub use report::{format_history, format_report};
pub use rewrite::rewrite;
pub use summarize::summarize_all;
pub use synthesize::synthesize;

use crate::gemini::GeminiError;
use crate::retrieve::RetrieveError;

/// Answer shown when retrieval yields nothing usable.
pub const NO_INFORMATION_ANSWER: &str =
    "No information found for this question. Try rephrasing it or asking something more specific.";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("document from {origin} has no text to summarize")]
    EmptyDocument { origin: String },

    #[error("no information found")]
    NoInformation,

    #[error("summarization failed for all {failures} documents")]
    AllSummariesFailed { failures: usize },

    #[error("language model: {0}")]
    Model(#[from] GeminiError),

    #[error("retrieval: {0}")]
    Retrieve(#[from] RetrieveError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub source: String,
    pub text: String,
}

/// A document left out of the answer because summarizing it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSummary {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct SummaryBatch {
    /// In retrieval order.
    pub summaries: Vec<Summary>,
    pub failed: Vec<FailedSummary>,
}

/// Everything one completed cycle produced, ready for rendering.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub question: String,
    pub rewritten_query: String,
    pub answer: String,
    pub summaries: Vec<Summary>,
    pub failed: Vec<FailedSummary>,
}

impl CycleReport {
    pub fn no_information(question: &str, rewritten_query: String) -> Self {
        Self {
            question: question.to_string(),
            rewritten_query,
            answer: NO_INFORMATION_ANSWER.to_string(),
            summaries: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn found_information(&self) -> bool {
        !self.summaries.is_empty()
    }
}
