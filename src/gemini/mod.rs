//! Gemini `generateContent` client and the `LanguageModel` seam the pipeline talks to.

pub(crate) mod client;
pub(crate) mod types;

pub use client::{GeminiClient, GeminiError, LanguageModel};
pub use types::Content;
