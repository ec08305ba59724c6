use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{RetrieveError, RetrievedDocument, Retriever, truncate_chars};

const BACKEND: &str = "Wikipedia";
const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const MAX_PAGES: usize = 3;
const MAX_EXTRACT_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    /// Search rank, 1-based.
    #[serde(default)]
    index: u32,
    extract: Option<String>,
    fullurl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

/// Wikipedia full-text search via the MediaWiki action API.
///
/// One request runs the search as a generator and pulls plain-text intro
/// extracts and canonical URLs for the top 3 hits. No key needed.
#[derive(Clone)]
pub struct WikipediaRetriever {
    http: Client,
    base_url: String,
}

impl WikipediaRetriever {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: API_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: format!("{base_url}/w/api.php"),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, RetrieveError> {
        let mut url = Url::parse(&self.base_url).map_err(|source| RetrieveError::InvalidUrl {
            backend: BACKEND,
            source,
        })?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("formatversion", "2")
            .append_pair("generator", "search")
            .append_pair("gsrsearch", query)
            .append_pair("gsrlimit", &MAX_PAGES.to_string())
            .append_pair("prop", "extracts|info")
            .append_pair("inprop", "url")
            .append_pair("exintro", "1")
            .append_pair("explaintext", "1")
            .append_pair("exlimit", "max")
            .append_pair("redirects", "1");
        Ok(url)
    }
}

impl Retriever for WikipediaRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrieveError> {
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
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Wikipedia rate limited");
            return Err(RetrieveError::RateLimited { backend: BACKEND });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Wikipedia API error");
            return Err(RetrieveError::Api {
                backend: BACKEND,
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..text.floor_char_boundary(200)]),
            });
        }

        let text = response.text().await.map_err(network)?;
        let Ok(body) = serde_json::from_str::<QueryResponse>(&text) else {
            warn!("Wikipedia returned a malformed body");
            return Err(RetrieveError::Api {
                backend: BACKEND,
                code: status.as_u16(),
                message: "malformed search response".to_string(),
            });
        };
        if let Some(err) = body.error {
            warn!(code = %err.code, "Wikipedia API error in 200 response");
            return Err(RetrieveError::Api {
                backend: BACKEND,
                code: status.as_u16(),
                message: format!("{}: {}", err.code, err.info),
            });
        }

        // no `query` object means the search matched nothing
        let mut pages = body.query.map(|q| q.pages).unwrap_or_default();
        pages.sort_by_key(|p| p.index);

        let documents: Vec<RetrievedDocument> = pages
            .into_iter()
            .filter_map(|page| {
                let extract = page.extract.filter(|e| !e.trim().is_empty())?;
                let source = page.fullurl.unwrap_or_else(|| page_url(&page.title));
                Some(RetrievedDocument {
                    text: truncate_chars(extract.trim(), MAX_EXTRACT_CHARS).to_string(),
                    source,
                })
            })
            .take(MAX_PAGES)
            .collect();

        debug!(results = documents.len(), "Wikipedia search complete");
        Ok(documents)
    }
}

fn page_url(title: &str) -> String {
    format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_uses_underscores() {
        assert_eq!(
            page_url("Machine learning"),
            "https://en.wikipedia.org/wiki/Machine_learning"
        );
    }

    #[test]
    fn search_url_encodes_query_and_limits_pages() {
        let retriever = WikipediaRetriever::new(Client::new());
        let url = retriever.search_url("C++ & Rust").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("gsrsearch".into(), "C++ & Rust".into())));
        assert!(pairs.contains(&("gsrlimit".into(), "3".into())));
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_pages_in_search_rank_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("generator", "search"))
            .and(query_param("gsrsearch", "machine learning"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "batchcomplete": true,
                "query": {
                    "pages": [
                        {
                            "pageid": 2,
                            "title": "Deep learning",
                            "index": 2,
                            "extract": "Deep learning is a subset of machine learning.",
                            "fullurl": "https://en.wikipedia.org/wiki/Deep_learning"
                        },
                        {
                            "pageid": 1,
                            "title": "Machine learning",
                            "index": 1,
                            "extract": "Machine learning is a field of study.",
                            "fullurl": "https://en.wikipedia.org/wiki/Machine_learning"
                        }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let retriever = WikipediaRetriever::with_base_url(Client::new(), &server.uri());
        let docs = retriever.retrieve("machine learning").await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "https://en.wikipedia.org/wiki/Machine_learning");
        assert_eq!(docs[0].text, "Machine learning is a field of study.");
        assert_eq!(docs[1].source, "https://en.wikipedia.org/wiki/Deep_learning");
    }

    #[tokio::test]
    async fn skips_empty_extracts_and_truncates_long_ones() {
        let server = MockServer::start().await;
        let long = "x".repeat(MAX_EXTRACT_CHARS + 500);
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": {
                    "pages": [
                        {"title": "Empty", "index": 1, "extract": ""},
                        {"title": "Long page", "index": 2, "extract": long}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let retriever = WikipediaRetriever::with_base_url(Client::new(), &server.uri());
        let docs = retriever.retrieve("anything").await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text.chars().count(), MAX_EXTRACT_CHARS);
        assert_eq!(docs[0].source, "https://en.wikipedia.org/wiki/Long_page");
    }

    #[tokio::test]
    async fn no_query_object_means_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"batchcomplete": true})),
            )
            .mount(&server)
            .await;

        let retriever = WikipediaRetriever::with_base_url(Client::new(), &server.uri());
        assert!(retriever.retrieve("qwertyuiop").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"code": "badvalue", "info": "Unrecognized value"}
            })))
            .mount(&server)
            .await;

        let retriever = WikipediaRetriever::with_base_url(Client::new(), &server.uri());
        match retriever.retrieve("q").await {
            Err(RetrieveError::Api { message, .. }) => assert!(message.contains("badvalue")),
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let retriever = WikipediaRetriever::with_base_url(Client::new(), &server.uri());
        match retriever.retrieve("q").await {
            Err(RetrieveError::Api { code: 200, message, .. }) => {
                assert_eq!(message, "malformed search response");
            }
            other => panic!("expected Api(200), got: {other:?}"),
        }
    }
}
