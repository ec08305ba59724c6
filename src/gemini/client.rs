use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ApiError, Content, GenerateContentRequest, GenerateContentResponse};
use crate::config::ApiKey;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("model returned no text (finish reason: {finish_reason})")]
    EmptyResponse { finish_reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Text generation from a conversation.
/// Implemented by `GeminiClient` for production; mock implementations used in tests.
pub trait LanguageModel {
    /// Generates a reply to `contents`, the last of which is the newest user turn.
    async fn generate(
        &self,
        contents: &[Content],
        system_instruction: Option<&str>,
    ) -> Result<String, GeminiError>;

    /// Single user prompt, no system instruction.
    async fn prompt(&self, text: &str) -> Result<String, GeminiError> {
        self.generate(&[Content::user(text)], None).await
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: Client, api_key: ApiKey, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key,
            model: model.into(),
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            model: crate::config::DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn generate_once(
        &self,
        contents: &[Content],
        system_instruction: Option<&str>,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let request = GenerateContentRequest {
            contents,
            system_instruction: system_instruction.map(Content::instruction),
        };

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limited");
            return Err(GeminiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<GenerateContentResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(err);
                warn!(error = %classified, "Gemini API error");
                return Err(classified);
            }
            let snippet = &text[..text.floor_char_boundary(200)];
            warn!(status = %status, "Gemini API error (no structured body)");
            return Err(GeminiError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        debug!(model = %self.model, turns = contents.len(), "gemini generation complete");

        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }
}

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

impl LanguageModel for GeminiClient {
    async fn generate(
        &self,
        contents: &[Content],
        system_instruction: Option<&str>,
    ) -> Result<String, GeminiError> {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.generate_once(contents, system_instruction).await {
                Ok(response) => return extract_text(&response),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(GeminiError::RateLimited))
    }
}

/// Joins the text parts of the first candidate.
fn extract_text(response: &GenerateContentResponse) -> Result<String, GeminiError> {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let text: String = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let finish_reason = candidate
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "NO_CANDIDATES".to_string());
        warn!(%finish_reason, "Gemini returned empty text (safety filter or empty response)");
        return Err(GeminiError::EmptyResponse { finish_reason });
    }

    Ok(text)
}

fn is_retriable(e: &GeminiError) -> bool {
    matches!(
        e,
        GeminiError::RateLimited
            | GeminiError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => GeminiError::RateLimited,
        Some(403) => GeminiError::QuotaExhausted(message),
        Some(code) => GeminiError::Api { code, message },
        None => GeminiError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::types::{Candidate, Part};

    fn response_with(parts: &[&str], finish_reason: Option<&str>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    parts: parts
                        .iter()
                        .map(|t| Part {
                            text: t.to_string(),
                        })
                        .collect(),
                    role: Some("model".into()),
                }),
                finish_reason: finish_reason.map(String::from),
            }]),
            error: None,
        }
    }

    #[test]
    fn classify_429_as_rate_limited() {
        let err = ApiError {
            code: Some(429),
            message: Some("Resource exhausted".into()),
        };
        assert!(matches!(classify_api_error(&err), GeminiError::RateLimited));
    }

    #[test]
    fn classify_403_as_quota_exhausted() {
        let err = ApiError {
            code: Some(403),
            message: Some("Quota exceeded".into()),
        };
        assert!(matches!(
            classify_api_error(&err),
            GeminiError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn classify_missing_code_keeps_message() {
        let err = ApiError {
            code: None,
            message: Some("weird".into()),
        };
        match classify_api_error(&err) {
            GeminiError::Api { code, message } => {
                assert_eq!(code, 0);
                assert!(message.contains("weird"));
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn extract_joins_all_parts() {
        let text = extract_text(&response_with(&["Hello, ", "world"], Some("STOP"))).unwrap();
        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn extract_blank_text_reports_finish_reason() {
        let err = extract_text(&response_with(&["  "], Some("SAFETY"))).unwrap_err();
        match err {
            GeminiError::EmptyResponse { finish_reason } => assert_eq!(finish_reason, "SAFETY"),
            other => panic!("expected EmptyResponse, got: {other:?}"),
        }
    }

    #[test]
    fn extract_without_candidates_is_empty_response() {
        let response = GenerateContentResponse {
            candidates: None,
            error: None,
        };
        assert!(matches!(
            extract_text(&response),
            Err(GeminiError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn only_rate_limits_and_server_errors_retry() {
        assert!(is_retriable(&GeminiError::RateLimited));
        assert!(is_retriable(&GeminiError::Api {
            code: 503,
            message: String::new()
        }));
        assert!(!is_retriable(&GeminiError::Api {
            code: 400,
            message: String::new()
        }));
        assert!(!is_retriable(&GeminiError::QuotaExhausted(String::new())));
    }

    #[test]
    fn backoff_stays_within_equal_jitter_bounds() {
        for attempt in 0..3 {
            let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
            let delay = jittered_backoff(attempt);
            assert!(delay >= base / 2 && delay < base, "attempt {attempt}: {delay}");
        }
    }
}
