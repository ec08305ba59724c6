use std::env;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    GeminiKeyNotSet,

    #[error("SERPAPI_API_KEY not set. Get one at https://serpapi.com/manage-api-key")]
    SerpApiKeyNotSet,
}

/// Secret that never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    #[cfg(test)]
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Process configuration, read once at startup.
///
/// - `GEMINI_API_KEY`: language model access (required)
/// - `SERPAPI_API_KEY`: web search access (required)
/// - `GEMINI_MODEL`: model name (optional, defaults to `gemini-2.0-flash`)
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: ApiKey,
    pub serpapi_api_key: ApiKey,
    pub gemini_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let gemini_api_key = non_blank("GEMINI_API_KEY").ok_or(ConfigError::GeminiKeyNotSet)?;
        let serpapi_api_key =
            non_blank("SERPAPI_API_KEY").ok_or(ConfigError::SerpApiKeyNotSet)?;
        let gemini_model = non_blank("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            gemini_api_key: ApiKey(gemini_api_key),
            serpapi_api_key: ApiKey(serpapi_api_key),
            gemini_model,
        })
    }
}
