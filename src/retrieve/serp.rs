use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{RetrieveError, RetrievedDocument, Retriever};
use crate::config::ApiKey;

const BACKEND: &str = "SerpAPI";
const API_URL: &str = "https://serpapi.com/search.json";
const MAX_RESULTS: usize = 5;
/// Source label for organic results that carry no link.
const FALLBACK_SOURCE: &str = "Google";
/// SerpAPI reports an empty result page through its `error` field.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    snippet: Option<String>,
    link: Option<String>,
}

/// Google web search through SerpAPI. Returns the first 5 organic results.
#[derive(Clone)]
pub struct SerpApiRetriever {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl SerpApiRetriever {
    pub fn new(http: Client, api_key: ApiKey) -> Self {
        Self {
            http,
            api_key,
            base_url: API_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            base_url: format!("{base_url}/search.json"),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, RetrieveError> {
        let mut url = Url::parse(&self.base_url).map_err(|source| RetrieveError::InvalidUrl {
            backend: BACKEND,
            source,
        })?;
        url.query_pairs_mut()
            .append_pair("engine", "google")
            .append_pair("q", query)
            .append_pair("api_key", self.api_key.expose());
        Ok(url)
    }
}

impl Retriever for SerpApiRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrieveError> {
        // request URLs may carry the API key
        let network = |source: reqwest::Error| RetrieveError::Network {
            backend: BACKEND,
            source: source.without_url(),
        };

        let response = self
            .http
            .get(self.search_url(query)?)
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let text = response.text().await.map_err(network)?;
        let body = serde_json::from_str::<SearchResponse>(&text).ok();
        let api_message = body.as_ref().and_then(|b| b.error.clone());

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("SerpAPI rate limited");
                return Err(RetrieveError::RateLimited { backend: BACKEND });
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RetrieveError::Unauthorized {
                    backend: BACKEND,
                    message: api_message.unwrap_or_else(|| format!("HTTP {status}")),
                });
            }
            s if !s.is_success() => {
                warn!(status = %s, "SerpAPI error");
                return Err(RetrieveError::Api {
                    backend: BACKEND,
                    code: s.as_u16(),
                    message: api_message
                        .unwrap_or_else(|| text[..text.floor_char_boundary(200)].to_string()),
                });
            }
            _ => {}
        }

        let Some(body) = body else {
            return Err(RetrieveError::Api {
                backend: BACKEND,
                code: status.as_u16(),
                message: "malformed search response".to_string(),
            });
        };

        if let Some(message) = body.error {
            if body.organic_results.is_empty() && message.contains(NO_RESULTS_MARKER) {
                debug!(%query, "SerpAPI found no results");
                return Ok(Vec::new());
            }
            warn!(error = %message, "SerpAPI error in 200 response");
            return Err(RetrieveError::Api {
                backend: BACKEND,
                code: status.as_u16(),
                message,
            });
        }

        let documents: Vec<RetrievedDocument> = body
            .organic_results
            .into_iter()
            .take(MAX_RESULTS)
            .map(|r| RetrievedDocument {
                text: r.snippet.unwrap_or_default(),
                source: r
                    .link
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| FALLBACK_SOURCE.to_string()),
            })
            .collect();

        debug!(results = documents.len(), "SerpAPI search complete");
        Ok(documents)
    }
}
