//! In-memory vector store for development and testing.
//!
//! Scoring is normalized keyword overlap rather than a real embedding
//! similarity, which is enough to exercise the retrieval, fusion, and
//! reranking paths without a live backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{RagError, Result};
use crate::vectorstore::{StoreHit, VectorStore};

/// A record stored in an [`InMemoryVectorStore`] collection.
#[derive(Debug, Clone)]
struct StoredDoc {
    id: String,
    content: String,
    metadata: HashMap<String, serde_json::Value>,
}

/// An in-memory [`VectorStore`] using keyword-overlap scoring.
///
/// Collections are nested maps behind a `tokio::sync::RwLock`:
/// collection name → document ID → record.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, StoredDoc>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named collection. No-op if it already exists.
    pub async fn create_collection(&self, name: &str) {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
    }

    /// Upsert a document into a collection, creating the collection if
    /// needed.
    pub async fn upsert(
        &self,
        collection: &str,
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        let id = id.into();
        let doc = StoredDoc { id: id.clone(), content: content.into(), metadata };
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().insert(id, doc);
    }

    /// Fraction of query tokens that occur in `text`, in `0..=1`.
    fn overlap_score(query_tokens: &[String], text: &str) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let lower = text.to_lowercase();
        let hits = query_tokens.iter().filter(|t| lower.contains(t.as_str())).count();
        hits as f32 / query_tokens.len() as f32
    }

    fn tokenize(query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(&self, collection: &str, query: &str, limit: usize) -> Result<Vec<StoreHit>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;

        let tokens = Self::tokenize(query);
        let mut hits: Vec<StoreHit> = store
            .values()
            .map(|doc| StoreHit {
                id: doc.id.clone(),
                content: doc.content.clone(),
                similarity: Self::overlap_score(&tokens, &doc.content),
                metadata: doc.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn hybrid_search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<StoreHit>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;

        let tokens = Self::tokenize(query);
        let mut hits: Vec<StoreHit> = store
            .values()
            .map(|doc| {
                let content_score = Self::overlap_score(&tokens, &doc.content);
                // Metadata matches count toward the keyword half.
                let metadata_text = doc
                    .metadata
                    .values()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let metadata_score = Self::overlap_score(&tokens, &metadata_text);
                StoreHit {
                    id: doc.id.clone(),
                    content: doc.content.clone(),
                    similarity: (0.7 * content_score + 0.3 * metadata_score).min(1.0),
                    metadata: doc.metadata.clone(),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    fn supports_hybrid(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_orders_by_overlap_descending() {
        let store = InMemoryVectorStore::new();
        store.upsert("docs", "a", "quarterly revenue report for the north", Default::default()).await;
        store.upsert("docs", "b", "employee onboarding handbook", Default::default()).await;
        store.upsert("docs", "c", "revenue summary", Default::default()).await;

        let hits = store.search("docs", "revenue report", 10).await.unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].similarity >= hits[1].similarity);
        assert!(hits.iter().any(|h| h.id == "c"));
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("nope", "query", 5).await.is_err());
    }

    #[tokio::test]
    async fn hybrid_search_weighs_metadata_matches() {
        let store = InMemoryVectorStore::new();
        let mut metadata = HashMap::new();
        metadata.insert("department".to_string(), serde_json::json!("finance"));
        store.upsert("docs", "a", "generic quarterly document", metadata).await;
        store.upsert("docs", "b", "generic quarterly document", Default::default()).await;

        let hits = store.hybrid_search("docs", "finance quarterly", 10).await.unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn limit_truncates_results() {
        let store = InMemoryVectorStore::new();
        for i in 0..10 {
            store.upsert("docs", format!("doc{i}"), "matching words here", Default::default()).await;
        }
        let hits = store.search("docs", "matching words", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }
}
