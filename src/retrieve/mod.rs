//! Document retrieval: SerpAPI web search, Wikipedia, and their weighted ensemble.

pub(crate) mod ensemble;
pub(crate) mod fusion;
pub(crate) mod serp;
pub(crate) mod wikipedia;

pub use ensemble::EnsembleRetriever;
pub use serp::SerpApiRetriever;
pub use wikipedia::WikipediaRetriever;

/// A retrieved passage and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedDocument {
    pub text: String,
    pub source: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieveError {
    #[error("{backend} rate limit exceeded. Please retry later.")]
    RateLimited { backend: &'static str },

    #[error("{backend} rejected the API key: {message}")]
    Unauthorized {
        backend: &'static str,
        message: String,
    },

    #[error("{backend} error ({code}): {message}")]
    Api {
        backend: &'static str,
        code: u16,
        message: String,
    },

    #[error("{backend} network error: {source}")]
    Network {
        backend: &'static str,
        source: reqwest::Error,
    },

    #[error("invalid {backend} URL: {source}")]
    InvalidUrl {
        backend: &'static str,
        source: url::ParseError,
    },
}

/// Ranked documents for a query.
/// Implemented by the search backends and by `EnsembleRetriever`; mock implementations used in tests.
pub trait Retriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrieveError>;
}

/// Keeps at most `max_chars` characters, cutting on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
