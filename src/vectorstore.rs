//! Vector store trait: the opaque retrieval backend.
//!
//! The store is keyed by collection name and queried with raw text;
//! embedding happens behind this boundary. Ingestion is likewise out of
//! scope for this crate; the chunkers produce what an ingestion
//! pipeline indexes.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// A single scored hit from the store, before source attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    /// Unique identifier of the stored chunk.
    pub id: String,
    /// The stored text content.
    pub content: String,
    /// Similarity to the query in `0..=1`, higher is better.
    pub similarity: f32,
    /// Stored metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// An opaque store of indexed content, keyed by collection name.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search a collection by vector similarity.
    ///
    /// Returns up to `limit` hits ordered by descending similarity.
    async fn search(&self, collection: &str, query: &str, limit: usize) -> Result<Vec<StoreHit>>;

    /// Search a collection combining vector similarity with keyword or
    /// structured filtering. The fusion weighting is owned by the
    /// backend.
    ///
    /// The default implementation delegates to [`search`](VectorStore::search);
    /// backends without hybrid support should also report it via
    /// [`supports_hybrid`](VectorStore::supports_hybrid) so callers can
    /// log the degradation.
    async fn hybrid_search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<StoreHit>> {
        self.search(collection, query, limit).await
    }

    /// Whether this backend implements genuine hybrid search.
    fn supports_hybrid(&self) -> bool {
        false
    }
}
