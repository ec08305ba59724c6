//! In-memory stand-ins for the language model and the retriever.

use std::sync::Mutex;

use crate::gemini::{Content, GeminiError, LanguageModel};
use crate::retrieve::{RetrieveError, RetrievedDocument, Retriever};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
}

impl RecordedCall {
    /// Text of the newest (last) turn.
    pub fn last_text(&self) -> &str {
        self.contents
            .last()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default()
    }
}

/// Answers every call through `respond` and records what it was asked.
pub(crate) struct FnModel<F> {
    respond: F,
    calls: Mutex<Vec<RecordedCall>>,
}

impl<F> FnModel<F>
where
    F: Fn(&RecordedCall) -> Result<String, GeminiError>,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl<F> LanguageModel for FnModel<F>
where
    F: Fn(&RecordedCall) -> Result<String, GeminiError>,
{
    async fn generate(
        &self,
        contents: &[Content],
        system_instruction: Option<&str>,
    ) -> Result<String, GeminiError> {
        let call = RecordedCall {
            contents: contents.to_vec(),
            system_instruction: system_instruction.map(String::from),
        };
        self.calls.lock().unwrap().push(call.clone());
        (self.respond)(&call)
    }
}

/// Always returns the same documents and records the queries it saw.
pub(crate) struct StaticRetriever {
    documents: Vec<RetrievedDocument>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl StaticRetriever {
    pub fn new(documents: Vec<RetrievedDocument>) -> Self {
        Self {
            documents,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Retriever for StaticRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrieveError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(RetrieveError::RateLimited { backend: "SerpAPI" });
        }
        Ok(self.documents.clone())
    }
}

pub(crate) fn doc(text: &str, source: &str) -> RetrievedDocument {
    RetrievedDocument {
        text: text.to_string(),
        source: source.to_string(),
    }
}
