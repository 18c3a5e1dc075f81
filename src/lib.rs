//! # ragkit
//!
//! A retrieval-augmented-generation pipeline: boundary-aware chunking,
//! query analysis, multi-source retrieval with optional hybrid fusion,
//! best-effort metadata enhancement, cross-encoder reranking, and
//! orchestrated answer generation with provenance metadata.
//!
//! ## Overview
//!
//! The crate is organized around one orchestrator and a set of
//! pluggable stages:
//!
//! - [`SemanticChunker`] / [`ElementChunker`]: split raw text or
//!   pre-extracted layout elements into retrievable [`Chunk`]s
//! - [`QueryAnalyzer`] / [`HeuristicAnalyzer`]: classify the query and
//!   derive the retrieval budget
//! - [`Retriever`]: fetch and fuse candidates from every data source
//!   through the opaque [`VectorStore`]
//! - [`MetadataEnhancer`]: best-effort aggregate-metadata enrichment
//! - [`HttpReranker`]: second-pass relevance scoring with graceful
//!   degradation
//! - [`RagPipeline`]: sequences the stages and assembles the
//!   [`RagQueryResult`]
//!
//! The vector store, metadata extractor, and generator are trait
//! boundaries: bring your own backends.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragkit::{InMemoryVectorStore, QueryOptions, RagPipeline};
//!
//! let store = Arc::new(InMemoryVectorStore::new());
//! let pipeline = RagPipeline::builder()
//!     .vector_store(store)
//!     .generator(Arc::new(my_generator))
//!     .reranker(ragkit::HttpReranker::from_env())
//!     .build()?;
//!
//! let result = pipeline
//!     .process_query("total revenue by region?", &["42".to_string()], QueryOptions::default())
//!     .await?;
//! println!("{}", result.content);
//! ```

pub mod analyzer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod element;
pub mod enhancer;
pub mod error;
pub mod generator;
pub mod inmemory;
pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod splitter;
pub mod vectorstore;

pub use analyzer::{HeuristicAnalyzer, QueryAnalysis, QueryAnalyzer, QueryComplexity, QueryIntent};
pub use chunking::{SemanticChunker, SemanticChunkerOptions};
pub use config::{PipelineConfig, PipelineConfigBuilder, RerankConfig};
pub use document::{Chunk, Coordinates, Document, DocumentElement, ElementMetadata, ElementType};
pub use element::{ElementChunker, ElementChunkerOptions};
pub use enhancer::{MetadataEnhancer, MetadataExtractor};
pub use error::{RagError, Result};
pub use generator::{GeneratedAnswer, Generator};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{
    QueryOptions, RagPipeline, RagPipelineBuilder, RagQueryResult, RagResponseMetadata, SourceRef,
};
pub use reranker::{HttpReranker, RerankableDocument, RerankedDocument, UNRANKED_SCORE};
pub use retriever::{Retrieval, RetrievalMethod, RetrievalOptions, Retriever};
pub use splitter::{SectionSplitter, SentenceSplitter, TextSplitter};
pub use vectorstore::{StoreHit, VectorStore};
