//! Answer generation boundary.
//!
//! The LLM completion endpoint is opaque to this crate: the pipeline
//! hands over the query, the fused context documents, and the query
//! analysis, and gets text back.

use async_trait::async_trait;

use crate::analyzer::QueryAnalysis;
use crate::document::Document;
use crate::error::Result;

/// The generator's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    /// The answer text.
    pub content: String,
    /// The model that actually served the request, when the backend
    /// reports it. Falls back to the requested model in the response
    /// metadata otherwise.
    pub model_used: Option<String>,
}

/// An opaque text generator that turns a query and its retrieved
/// context into the final answer.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an answer grounded in `documents`.
    ///
    /// `analysis` carries the classification flags so implementations
    /// can adjust generation parameters (for example more structured
    /// output for analytical queries). `model` is the requested model
    /// name.
    async fn generate(
        &self,
        query: &str,
        documents: &[Document],
        analysis: &QueryAnalysis,
        model: &str,
    ) -> Result<GeneratedAnswer>;
}
