//! One interactive session: its history and the question-answering loop.

use tracing::{debug, info, warn};

use crate::gemini::LanguageModel;
use crate::history::{History, HistoryPolicy, Turn};
use crate::pipeline::{
    self, CycleReport, PipelineError,
    summarize::{DEFAULT_CONCURRENCY, SUMMARY_LIMIT},
};
use crate::retrieve::Retriever;

/// Where the loop is within a cycle. Every cycle starts and ends at `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    RewritingQuery,
    Retrieving { query: String },
    Summarizing { documents: usize },
    Synthesizing,
    Rendered,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a question is still being answered")]
    Busy,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub history_policy: HistoryPolicy,
    pub summary_limit: usize,
    pub summary_concurrency: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_policy: HistoryPolicy::default(),
            summary_limit: SUMMARY_LIMIT,
            summary_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Owns the history and drives rewrite → retrieve → summarize → synthesize.
///
/// `submit` takes `&mut self`, so one session answers one question at a time.
/// A failed cycle leaves the history untouched.
pub struct Session<M, R> {
    model: M,
    retriever: R,
    history: History,
    state: LoopState,
    options: SessionOptions,
}

impl<M: LanguageModel, R: Retriever> Session<M, R> {
    pub fn new(model: M, retriever: R, options: SessionOptions) -> Self {
        Self {
            model,
            retriever,
            history: History::new(),
            state: LoopState::Idle,
            options,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Empties the history. Only allowed between cycles.
    pub fn clear_history(&mut self) -> Result<(), SessionError> {
        if self.state != LoopState::Idle {
            return Err(SessionError::Busy);
        }
        self.history.clear();
        info!("history cleared");
        Ok(())
    }

    /// Answers `question`, reporting each state change to `on_state`.
    pub async fn submit(
        &mut self,
        question: &str,
        mut on_state: impl FnMut(&LoopState),
    ) -> Result<CycleReport, SessionError> {
        if self.state != LoopState::Idle {
            // only reachable if a previous submit future was dropped mid-flight
            warn!(state = ?self.state, "abandoned cycle found, resetting");
            self.state = LoopState::Idle;
        }

        let result = self.run_cycle(question, &mut on_state).await;
        if let Err(e) = &result {
            warn!(error = %e, "cycle failed, history unchanged");
        }
        self.enter(LoopState::Idle, &mut on_state);
        result.map_err(SessionError::from)
    }

    async fn run_cycle(
        &mut self,
        question: &str,
        on_state: &mut impl FnMut(&LoopState),
    ) -> Result<CycleReport, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        info!(%question, "new question");

        self.enter(LoopState::RewritingQuery, on_state);
        let rewritten = pipeline::rewrite(&self.model, &self.history, question).await?;

        self.enter(
            LoopState::Retrieving {
                query: rewritten.clone(),
            },
            on_state,
        );
        let docs = self.retriever.retrieve(&rewritten).await?;
        info!(documents = docs.len(), "retrieval complete");

        let report = if docs.is_empty() {
            CycleReport::no_information(question, rewritten)
        } else {
            self.enter(
                LoopState::Summarizing {
                    documents: docs.len().min(self.options.summary_limit),
                },
                on_state,
            );
            let batch = pipeline::summarize_all(
                &self.model,
                &docs,
                self.options.summary_limit,
                self.options.summary_concurrency,
            )
            .await?;

            self.enter(LoopState::Synthesizing, on_state);
            match pipeline::synthesize(&self.model, &batch.summaries).await {
                Ok(answer) => CycleReport {
                    question: question.to_string(),
                    rewritten_query: rewritten,
                    answer,
                    summaries: batch.summaries,
                    failed: batch.failed,
                },
                Err(PipelineError::NoInformation) => CycleReport {
                    failed: batch.failed,
                    ..CycleReport::no_information(question, rewritten)
                },
                Err(e) => return Err(e),
            }
        };

        self.record(&report);
        self.enter(LoopState::Rendered, on_state);
        Ok(report)
    }

    fn record(&mut self, report: &CycleReport) {
        self.history.push(Turn::user(report.question.as_str()));
        if self.options.history_policy == HistoryPolicy::QuestionsAndAnswers
            && report.found_information()
        {
            self.history.push(Turn::assistant(report.answer.as_str()));
        }
    }

    fn enter(&mut self, state: LoopState, on_state: &mut impl FnMut(&LoopState)) {
        debug!(from = ?self.state, to = ?state, "state transition");
        self.state = state;
        on_state(&self.state);
    }
}
