use tracing::debug;

use super::{PipelineError, Summary};
use crate::gemini::LanguageModel;

/// Writes the final answer from the summaries alone.
///
/// With no summaries the model is not called and `NoInformation` is returned.
pub async fn synthesize(
    model: &impl LanguageModel,
    summaries: &[Summary],
) -> Result<String, PipelineError> {
    if summaries.is_empty() {
        return Err(PipelineError::NoInformation);
    }

    let combined = summaries
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Write a detailed, user-friendly research answer based on these summaries:\n\
         {combined}\n\n\
         Answer only from these summaries, not from your own knowledge. \
         Make it comprehensive and informative, and add references if possible."
    );

    let answer = model.prompt(&prompt).await?;
    debug!(summaries = summaries.len(), chars = answer.len(), "answer synthesized");
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GeminiError;
    use crate::testing::FnModel;

    fn summary(source: &str, text: &str) -> Summary {
        Summary {
            source: source.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn no_summaries_never_calls_the_model() {
        let model = FnModel::new(|_| Ok("should not happen".into()));
        let err = synthesize(&model, &[]).await.unwrap_err();

        assert!(matches!(err, PipelineError::NoInformation));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn prompt_carries_newline_joined_summaries() {
        let model = FnModel::new(|_| Ok("Final answer.".into()));
        let summaries = [
            summary("a", "Machine learning learns from data."),
            summary("b", "It is a branch of AI."),
        ];

        let answer = synthesize(&model, &summaries).await.unwrap();

        assert_eq!(answer, "Final answer.");
        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        let prompt = calls[0].last_text();
        assert!(prompt.contains("Machine learning learns from data.\nIt is a branch of AI."));
        assert!(prompt.contains("only from these summaries"));
        assert!(calls[0].system_instruction.is_none());
    }

    #[tokio::test]
    async fn model_failure_is_surfaced() {
        let model = FnModel::new(|_| Err(GeminiError::QuotaExhausted("daily".into())));
        let err = synthesize(&model, &[summary("a", "t")]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Model(GeminiError::QuotaExhausted(_))));
    }
}
