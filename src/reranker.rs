//! Second-pass relevance scoring via an external cross-encoder endpoint.
//!
//! [`HttpReranker`] posts the query and candidate texts to a
//! Cohere-compatible rerank API and maps the returned `(index,
//! relevance_score)` pairs back onto the original documents. Reranking
//! is strictly best-effort: a missing API key, transport failure, or
//! malformed response yields every document in its original order with
//! the `-1.0` unranked sentinel, never an error to the caller.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::RerankConfig;

/// The reserved score meaning "reranking failed, order is unranked".
pub const UNRANKED_SCORE: f32 = -1.0;

/// Per-request deadline for the rerank endpoint. A timeout is treated
/// like any other transport failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A candidate handed to the reranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankableDocument {
    /// Identifier used to trace the document back after reordering.
    pub id: String,
    /// The text scored by the cross-encoder.
    pub text: String,
    /// Passthrough fields, preserved untouched.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A reranked candidate: the original document plus a relevance score.
///
/// The score is relevance (not similarity); [`UNRANKED_SCORE`] marks a
/// degraded, unranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedDocument {
    /// The original document, unmodified.
    #[serde(flatten)]
    pub document: RerankableDocument,
    /// Relevance score from the cross-encoder, or [`UNRANKED_SCORE`].
    pub score: f32,
}

// ── Rerank API request/response types ──────────────────────────────

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<RerankRequestDocument<'a>>,
    return_documents: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_n: Option<usize>,
}

#[derive(Serialize)]
struct RerankRequestDocument<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

/// Client for the external rerank scoring endpoint.
pub struct HttpReranker {
    client: reqwest::Client,
    config: RerankConfig,
}

impl HttpReranker {
    /// Create a reranker with the given configuration.
    pub fn new(config: RerankConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Create a reranker configured from the environment
    /// (`RERANK_API_KEY`, `RERANK_MODEL`).
    pub fn from_env() -> Self {
        Self::new(RerankConfig::from_env())
    }

    /// Rerank documents by relevance to `query`.
    ///
    /// Returns at most `top_n` documents when given, ordered by the
    /// scorer. Never fails: on a missing key, transport error, or
    /// malformed response, documents come back in their original order
    /// scored [`UNRANKED_SCORE`], still capped at `top_n`. An empty
    /// input returns an empty `Vec` without calling the endpoint.
    pub async fn rerank(
        &self,
        query: &str,
        documents: Vec<RerankableDocument>,
        top_n: Option<usize>,
    ) -> Vec<RerankedDocument> {
        if documents.is_empty() {
            return Vec::new();
        }

        let Some(api_key) = self.config.api_key.as_deref() else {
            warn!("rerank API key not configured, returning unranked documents");
            return unranked(documents, top_n);
        };

        debug!(
            model = %self.config.model,
            documents = documents.len(),
            top_n,
            "calling rerank endpoint"
        );

        let request = RerankRequest {
            model: &self.config.model,
            query,
            documents: documents.iter().map(|d| RerankRequestDocument { text: &d.text }).collect(),
            return_documents: false,
            top_n,
        };

        let response = match self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "rerank request failed, returning unranked documents");
                return unranked(documents, top_n);
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "rerank endpoint returned an error, returning unranked documents");
            return unranked(documents, top_n);
        }

        let parsed: RerankResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "failed to parse rerank response, returning unranked documents");
                return unranked(documents, top_n);
            }
        };

        remap(&documents, parsed.results)
    }
}

/// Map scorer results back onto the original documents.
///
/// Each returned index refers to the position in the *original* input.
/// An index with no matching document is dropped with a warning; the
/// rest of the batch is unaffected.
fn remap(documents: &[RerankableDocument], results: Vec<RerankResult>) -> Vec<RerankedDocument> {
    let mut reranked = Vec::with_capacity(results.len());
    for result in results {
        match documents.get(result.index) {
            Some(document) => reranked.push(RerankedDocument {
                document: document.clone(),
                score: result.relevance_score,
            }),
            None => {
                warn!(
                    index = result.index,
                    documents = documents.len(),
                    "rerank result index out of range, dropping it"
                );
            }
        }
    }
    reranked
}

/// The degraded fallback: documents in their original order, scored
/// with the unranked sentinel and capped at `top_n` like a successful
/// rerank would be.
fn unranked(documents: Vec<RerankableDocument>, top_n: Option<usize>) -> Vec<RerankedDocument> {
    let keep = top_n.unwrap_or(documents.len());
    documents
        .into_iter()
        .take(keep)
        .map(|document| RerankedDocument { document, score: UNRANKED_SCORE })
        .collect()
}
