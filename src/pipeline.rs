//! RAG pipeline orchestration.
//!
//! [`RagPipeline`] sequences the stages: analyze the query, retrieve
//! candidates (vector or hybrid), optionally enhance their metadata,
//! optionally rerank, generate the answer, and assemble the final
//! result with provenance metadata.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragkit::{RagPipeline, InMemoryVectorStore, QueryOptions};
//!
//! let pipeline = RagPipeline::builder()
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! let result = pipeline
//!     .process_query("total revenue by region?", &["42".to_string()], QueryOptions::default())
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::analyzer::{HeuristicAnalyzer, QueryAnalysis, QueryAnalyzer};
use crate::config::PipelineConfig;
use crate::document::Document;
use crate::enhancer::{MetadataEnhancer, MetadataExtractor};
use crate::error::{RagError, Result};
use crate::generator::Generator;
use crate::reranker::{HttpReranker, RerankableDocument};
use crate::retriever::{RetrievalMethod, RetrievalOptions, Retriever};
use crate::vectorstore::VectorStore;

/// Maximum snippet length in a [`SourceRef`], in characters.
const SNIPPET_LIMIT: usize = 200;

/// Per-call overrides for [`RagPipeline::process_query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Override the configured similarity threshold.
    pub similarity_threshold: Option<f32>,
    /// Override whether store metadata is kept.
    pub include_metadata: Option<bool>,
    /// Override the per-source candidate limit. When absent, the
    /// query analysis' `search_limit` is used.
    pub limit: Option<usize>,
    /// Force hybrid retrieval on or off. When absent, hybrid is used
    /// for analytical queries.
    pub use_hybrid_search: Option<bool>,
    /// Override the generation model.
    pub model: Option<String>,
}

/// A provenance reference to one context document in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// The document's ID.
    pub id: String,
    /// A snippet of the document content, truncated to 200 characters
    /// with a trailing ellipsis when longer.
    pub content: String,
    /// The document's similarity score.
    pub similarity: f32,
    /// The document's metadata (possibly enhanced).
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

/// Provenance and timing metadata attached to every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagResponseMetadata {
    /// Wall-clock processing time in milliseconds.
    pub process_time_ms: u64,
    /// The data sources consulted (or, for provided documents, the
    /// de-duplicated set of their source IDs).
    pub data_source_ids: Vec<String>,
    /// Number of context documents behind the answer.
    pub documents_retrieved: usize,
    /// How the context was obtained.
    pub retrieval_method: RetrievalMethod,
    /// The model that served (or was requested for) generation.
    pub model_used: String,
    /// Snapshot of the query analysis that drove the pipeline.
    pub query_analysis: QueryAnalysis,
}

/// The assembled answer with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryResult {
    /// The original query.
    pub query: String,
    /// The generated answer text.
    pub content: String,
    /// References to the context documents, in final ranked order.
    pub sources: Vec<SourceRef>,
    /// Provenance and timing metadata.
    pub metadata: RagResponseMetadata,
}

/// The RAG orchestrator. Construct one via [`RagPipeline::builder()`].
///
/// The analyzer, store, and generator are required stages; the
/// metadata enhancer and reranker are optional and strictly
/// best-effort: their failures degrade the result without failing
/// the query.
pub struct RagPipeline {
    config: PipelineConfig,
    analyzer: Arc<dyn QueryAnalyzer>,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    enhancer: Option<MetadataEnhancer>,
    reranker: Option<HttpReranker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Answer a query over the given data sources.
    ///
    /// Runs the full pipeline: analyze → retrieve → enhance (optional)
    /// → rerank (optional) → generate → assemble.
    ///
    /// # Errors
    ///
    /// Analysis, retrieval, and generation failures are logged with
    /// context and propagated unchanged. Enhancement and reranking
    /// never produce errors.
    pub async fn process_query(
        &self,
        query: &str,
        data_source_ids: &[String],
        options: QueryOptions,
    ) -> Result<RagQueryResult> {
        let start = Instant::now();

        let analysis = self.analyzer.analyze(query).await;
        info!(
            is_analytical = analysis.is_analytical,
            search_limit = analysis.search_limit,
            "query analyzed"
        );

        let retrieval_options = self.retrieval_options(&analysis, &options);
        let retrieval = self
            .retriever
            .retrieve_from_all_sources(query, data_source_ids, &retrieval_options)
            .await
            .map_err(|e| {
                error!(error = %e, sources = data_source_ids.len(), "retrieval failed");
                e
            })?;

        self.run_generation(
            query,
            retrieval.documents,
            analysis,
            retrieval.method,
            data_source_ids.to_vec(),
            options,
            start,
        )
        .await
    }

    /// Answer a query over a caller-supplied document set, skipping
    /// retrieval entirely.
    ///
    /// The result is tagged `retrieval_method = "provided"` and its
    /// `data_source_ids` are the de-duplicated source IDs of the given
    /// documents. An empty document set is valid and yields
    /// `documents_retrieved = 0`.
    ///
    /// # Errors
    ///
    /// Analysis and generation failures propagate as in
    /// [`process_query`](RagPipeline::process_query).
    pub async fn generate_response_from_documents(
        &self,
        query: &str,
        documents: Vec<Document>,
        options: QueryOptions,
    ) -> Result<RagQueryResult> {
        let start = Instant::now();
        let analysis = self.analyzer.analyze(query).await;

        let mut data_source_ids = Vec::new();
        for doc in &documents {
            if !data_source_ids.contains(&doc.source_id) {
                data_source_ids.push(doc.source_id.clone());
            }
        }

        self.run_generation(
            query,
            documents,
            analysis,
            RetrievalMethod::Provided,
            data_source_ids,
            options,
            start,
        )
        .await
    }

    /// The shared tail of both entry points: enhance → rerank →
    /// generate → assemble.
    async fn run_generation(
        &self,
        query: &str,
        documents: Vec<Document>,
        analysis: QueryAnalysis,
        method: RetrievalMethod,
        data_source_ids: Vec<String>,
        options: QueryOptions,
        start: Instant,
    ) -> Result<RagQueryResult> {
        let documents = match &self.enhancer {
            Some(enhancer) => enhancer.enhance(documents, query).await,
            None => documents,
        };

        let documents = match &self.reranker {
            Some(reranker) => rerank_documents(reranker, query, documents).await,
            None => documents,
        };

        let model = options.model.as_deref().unwrap_or(&self.config.model);
        let answer =
            self.generator.generate(query, &documents, &analysis, model).await.map_err(|e| {
                error!(error = %e, "generation failed");
                e
            })?;

        let sources = documents
            .iter()
            .map(|doc| SourceRef {
                id: doc.id.clone(),
                content: snippet(&doc.content),
                similarity: doc.similarity,
                metadata: doc.metadata.clone(),
            })
            .collect();

        let result = RagQueryResult {
            query: query.to_string(),
            content: answer.content,
            sources,
            metadata: RagResponseMetadata {
                process_time_ms: start.elapsed().as_millis() as u64,
                data_source_ids,
                documents_retrieved: documents.len(),
                retrieval_method: method,
                model_used: answer.model_used.unwrap_or_else(|| model.to_string()),
                query_analysis: analysis,
            },
        };

        info!(
            documents = result.metadata.documents_retrieved,
            method = result.metadata.retrieval_method.as_str(),
            process_time_ms = result.metadata.process_time_ms,
            "query processed"
        );

        Ok(result)
    }

    /// Resolve the effective retrieval options from the pipeline
    /// defaults, the query analysis, and the per-call overrides.
    fn retrieval_options(
        &self,
        analysis: &QueryAnalysis,
        options: &QueryOptions,
    ) -> RetrievalOptions {
        let defaults = &self.config.retrieval;
        RetrievalOptions {
            similarity_threshold: options
                .similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
            include_metadata: options.include_metadata.unwrap_or(defaults.include_metadata),
            limit: options.limit.unwrap_or(analysis.search_limit),
            use_hybrid_search: options.use_hybrid_search.unwrap_or(analysis.is_analytical),
        }
    }
}

/// Rerank retrieved documents and reorder them accordingly.
///
/// The unranked sentinel fallback keeps the original order, so a
/// degraded rerank is a no-op reordering.
async fn rerank_documents(
    reranker: &HttpReranker,
    query: &str,
    documents: Vec<Document>,
) -> Vec<Document> {
    if documents.is_empty() {
        return documents;
    }

    let candidates: Vec<RerankableDocument> = documents
        .iter()
        .map(|doc| RerankableDocument {
            id: doc.id.clone(),
            text: doc.content.clone(),
            extra: Default::default(),
        })
        .collect();

    let reranked = reranker.rerank(query, candidates, None).await;

    // Reorder the originals by the reranked id sequence. Documents the
    // scorer did not return are dropped only if the scorer ranked a
    // strict subset; the sentinel fallback always returns everything.
    let mut remaining = documents;
    let mut ordered = Vec::with_capacity(reranked.len());
    for entry in &reranked {
        if let Some(pos) = remaining.iter().position(|d| d.id == entry.document.id) {
            ordered.push(remaining.remove(pos));
        }
    }
    ordered
}

/// Truncate content to the snippet limit, appending an ellipsis when
/// anything was cut.
fn snippet(content: &str) -> String {
    if content.chars().count() <= SNIPPET_LIMIT {
        return content.to_string();
    }
    let truncated: String = content.chars().take(SNIPPET_LIMIT).collect();
    format!("{truncated}...")
}

/// Builder for constructing a [`RagPipeline`].
///
/// The vector store and generator are required; the analyzer defaults
/// to [`HeuristicAnalyzer`]; the metadata extractor and reranker are
/// optional capabilities.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<PipelineConfig>,
    analyzer: Option<Arc<dyn QueryAnalyzer>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn Generator>>,
    metadata_extractor: Option<Arc<dyn MetadataExtractor>>,
    reranker: Option<HttpReranker>,
    collection_prefix: Option<String>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the default query analyzer.
    pub fn analyzer(mut self, analyzer: Arc<dyn QueryAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Enable best-effort metadata enhancement with this extractor.
    pub fn metadata_extractor(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.metadata_extractor = Some(extractor);
        self
    }

    /// Enable reranking with this reranker.
    pub fn reranker(mut self, reranker: HttpReranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Override the store collection-name prefix (`datasource_` by
    /// default).
    pub fn collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.collection_prefix = Some(prefix.into());
        self
    }

    /// Build the [`RagPipeline`], validating that the required stages
    /// are present.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the vector store or
    /// generator is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        let mut retriever = Retriever::new(vector_store);
        if let Some(prefix) = self.collection_prefix {
            retriever = retriever.with_collection_prefix(prefix);
        }

        Ok(RagPipeline {
            config: self.config.unwrap_or_default(),
            analyzer: self.analyzer.unwrap_or_else(|| Arc::new(HeuristicAnalyzer)),
            retriever,
            generator,
            enhancer: self.metadata_extractor.map(MetadataEnhancer::new),
            reranker: self.reranker,
        })
    }
}
