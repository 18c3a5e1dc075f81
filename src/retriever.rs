//! Multi-source candidate retrieval.
//!
//! [`Retriever`] queries every listed data source's collection through
//! the opaque [`VectorStore`], filters weak candidates, truncates each
//! source's contribution, and merges everything into one
//! similarity-sorted list annotated with the originating source.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::vectorstore::{StoreHit, VectorStore};

/// How the final candidate set was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    /// Pure vector-similarity retrieval.
    Vector,
    /// Vector similarity fused with keyword/structured filtering.
    Hybrid,
    /// Documents were supplied by the caller; no retrieval ran.
    Provided,
}

impl RetrievalMethod {
    /// The canonical string form used in response metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Hybrid => "hybrid",
            Self::Provided => "provided",
        }
    }
}

/// Options for a retrieval request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    /// Candidates below this similarity are dropped.
    pub similarity_threshold: f32,
    /// When false, store metadata is stripped from the results.
    pub include_metadata: bool,
    /// Maximum number of candidates kept per source.
    pub limit: usize,
    /// Route through the store's hybrid search.
    pub use_hybrid_search: bool,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self { similarity_threshold: 0.3, include_metadata: true, limit: 10, use_hybrid_search: false }
    }
}

/// The merged retrieval result with the method actually used.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Candidates sorted by descending similarity, `source_id` populated.
    pub documents: Vec<Document>,
    /// The method that actually ran (hybrid requests fall back to
    /// vector when the store has no hybrid support).
    pub method: RetrievalMethod,
}

/// Fetches candidates from one or more data sources.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    collection_prefix: String,
}

impl Retriever {
    /// Oversampling factor: each store query requests this multiple of
    /// the per-source limit so threshold filtering still fills it.
    const CANDIDATE_FACTOR: usize = 2;

    /// Create a retriever over the given store. Collections are named
    /// `datasource_{id}` by default.
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store, collection_prefix: "datasource_".to_string() }
    }

    /// Override the collection-name prefix.
    pub fn with_collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.collection_prefix = prefix.into();
        self
    }

    /// The collection name for a data source ID.
    pub fn collection_for(&self, data_source_id: &str) -> String {
        format!("{}{data_source_id}", self.collection_prefix)
    }

    /// Retrieve candidates from every listed data source.
    ///
    /// Sources are queried concurrently; the merge re-sorts by
    /// descending similarity (document ID breaks ties) so the result is
    /// deterministic regardless of completion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] when any source's store
    /// query fails. Retrieval is pipeline-fatal; degradation belongs to
    /// the optional stages, not here.
    pub async fn retrieve_from_all_sources(
        &self,
        query: &str,
        data_source_ids: &[String],
        options: &RetrievalOptions,
    ) -> Result<Retrieval> {
        if data_source_ids.is_empty() {
            return Ok(Retrieval { documents: Vec::new(), method: RetrievalMethod::Vector });
        }

        let use_hybrid = options.use_hybrid_search && self.store.supports_hybrid();
        if options.use_hybrid_search && !use_hybrid {
            warn!("hybrid search requested but the store does not support it, using vector search");
        }

        let candidate_limit = options.limit.saturating_mul(Self::CANDIDATE_FACTOR).max(1);
        let searches = data_source_ids.iter().map(|source_id| {
            let collection = self.collection_for(source_id);
            async move {
                let hits = if use_hybrid {
                    self.store.hybrid_search(&collection, query, candidate_limit).await
                } else {
                    self.store.search(&collection, query, candidate_limit).await
                };
                (source_id.clone(), hits)
            }
        });

        let mut documents = Vec::new();
        for (source_id, hits) in join_all(searches).await {
            let hits = hits.map_err(|e| RagError::RetrievalError {
                source_id: source_id.clone(),
                message: e.to_string(),
            })?;

            let mut kept: Vec<Document> = hits
                .into_iter()
                .filter(|h| h.similarity >= options.similarity_threshold)
                .map(|h| annotate(h, &source_id, options.include_metadata))
                .collect();
            kept.truncate(options.limit);
            documents.extend(kept);
        }

        // Deterministic merge independent of per-source completion order.
        documents.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let method = if use_hybrid { RetrievalMethod::Hybrid } else { RetrievalMethod::Vector };
        info!(
            sources = data_source_ids.len(),
            documents = documents.len(),
            method = method.as_str(),
            "retrieval completed"
        );

        Ok(Retrieval { documents, method })
    }
}

/// Wrap a store hit with source attribution.
fn annotate(hit: StoreHit, source_id: &str, include_metadata: bool) -> Document {
    Document {
        id: hit.id,
        content: hit.content,
        source_id: source_id.to_string(),
        similarity: hit.similarity,
        metadata: if include_metadata { hit.metadata } else { Default::default() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryVectorStore;

    async fn seeded_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store.upsert("datasource_A", "a1", "revenue report northern region", Default::default()).await;
        store.upsert("datasource_A", "a2", "revenue forecast", Default::default()).await;
        store.upsert("datasource_A", "a3", "unrelated holiday schedule", Default::default()).await;
        store.create_collection("datasource_B").await;
        store.upsert("datasource_B", "b1", "completely different topic", Default::default()).await;
        store
    }

    #[tokio::test]
    async fn merges_sources_and_filters_below_threshold() {
        let retriever = Retriever::new(seeded_store().await);
        let options = RetrievalOptions { similarity_threshold: 0.5, ..Default::default() };
        let retrieval = retriever
            .retrieve_from_all_sources(
                "revenue report",
                &["A".to_string(), "B".to_string()],
                &options,
            )
            .await
            .unwrap();

        assert!(!retrieval.documents.is_empty());
        assert!(retrieval.documents.iter().all(|d| d.source_id == "A"));
        assert!(retrieval.documents.iter().all(|d| d.similarity >= 0.5));
        for pair in retrieval.documents.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        assert_eq!(retrieval.method, RetrievalMethod::Vector);
    }

    #[tokio::test]
    async fn hybrid_request_tags_results_hybrid() {
        let retriever = Retriever::new(seeded_store().await);
        let options = RetrievalOptions { use_hybrid_search: true, ..Default::default() };
        let retrieval = retriever
            .retrieve_from_all_sources("revenue", &["A".to_string()], &options)
            .await
            .unwrap();
        assert_eq!(retrieval.method, RetrievalMethod::Hybrid);
    }

    #[tokio::test]
    async fn empty_source_list_yields_no_documents() {
        let retriever = Retriever::new(seeded_store().await);
        let retrieval = retriever
            .retrieve_from_all_sources("anything", &[], &RetrievalOptions::default())
            .await
            .unwrap();
        assert!(retrieval.documents.is_empty());
    }

    #[tokio::test]
    async fn missing_collection_is_a_retrieval_error() {
        let retriever = Retriever::new(seeded_store().await);
        let err = retriever
            .retrieve_from_all_sources("anything", &["missing".to_string()], &RetrievalOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::RetrievalError { .. }));
    }

    #[tokio::test]
    async fn per_source_limit_truncates_contributions() {
        let store = Arc::new(InMemoryVectorStore::new());
        for i in 0..8 {
            store
                .upsert("datasource_A", format!("a{i}"), "revenue report data", Default::default())
                .await;
        }
        let retriever = Retriever::new(store);
        let options = RetrievalOptions { limit: 3, ..Default::default() };
        let retrieval = retriever
            .retrieve_from_all_sources("revenue report", &["A".to_string()], &options)
            .await
            .unwrap();
        assert_eq!(retrieval.documents.len(), 3);
    }

    #[tokio::test]
    async fn metadata_is_stripped_when_not_requested() {
        let store = Arc::new(InMemoryVectorStore::new());
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("fileType".to_string(), serde_json::json!("pdf"));
        store.upsert("datasource_A", "a1", "revenue report", metadata).await;

        let retriever = Retriever::new(store);
        let options = RetrievalOptions { include_metadata: false, ..Default::default() };
        let retrieval = retriever
            .retrieve_from_all_sources("revenue report", &["A".to_string()], &options)
            .await
            .unwrap();
        assert!(retrieval.documents[0].metadata.is_empty());
    }
}
