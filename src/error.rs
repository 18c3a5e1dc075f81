//! Error types for the `ragkit` crate.

use thiserror::Error;

/// Errors that can occur in RAG pipeline operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// An error occurred during query analysis.
    #[error("Analysis error: {0}")]
    AnalysisError(String),

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while retrieving from a data source.
    #[error("Retrieval error (source {source_id}): {message}")]
    RetrievalError {
        /// The data source whose retrieval failed.
        source_id: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while calling the rerank endpoint.
    #[error("Reranker error: {0}")]
    RerankerError(String),

    /// An error occurred during answer generation.
    #[error("Generation error: {0}")]
    GenerationError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the RAG pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
