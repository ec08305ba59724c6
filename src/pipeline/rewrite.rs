use tracing::{debug, warn};

use super::PipelineError;
use crate::gemini::{Content, GeminiError, LanguageModel};
use crate::history::{History, Role, Turn};

pub(crate) const REWRITE_INSTRUCTION: &str = "You are a query rewriting expert. \
Based on the provided chat history, rephrase the user's last question into a complete, \
standalone research query. Resolve pronouns and references to earlier turns. \
Only return the rewritten question and nothing else. \
If the question is already complete (for example \"what is machine learning\"), return it unchanged.";

/// Rewrites `question` into a standalone query using the session history as context.
///
/// Never returns an empty string: a blank model reply falls back to the question itself.
pub async fn rewrite(
    model: &impl LanguageModel,
    history: &History,
    question: &str,
) -> Result<String, PipelineError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PipelineError::EmptyQuestion);
    }

    let mut contents: Vec<Content> = history.turns().iter().map(to_content).collect();
    contents.push(Content::user(question));

    let rewritten = match model.generate(&contents, Some(REWRITE_INSTRUCTION)).await {
        Ok(text) => text,
        Err(GeminiError::EmptyResponse { finish_reason }) => {
            warn!(%finish_reason, "rewrite returned no text, using the original question");
            return Ok(question.to_string());
        }
        Err(e) => return Err(e.into()),
    };

    let rewritten = rewritten.trim();
    if rewritten.is_empty() {
        warn!("rewrite returned blank text, using the original question");
        return Ok(question.to_string());
    }

    debug!(original = %question, rewritten = %rewritten, "query rewritten");
    Ok(rewritten.to_string())
}

fn to_content(turn: &Turn) -> Content {
    match turn.role() {
        Role::User => Content::user(turn.content()),
        Role::Assistant => Content::model(turn.content()),
    }
}
