//! Configuration for the pipeline and its external services.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::retriever::RetrievalOptions;

/// Default rerank endpoint (Cohere-compatible wire format).
const DEFAULT_RERANK_ENDPOINT: &str = "https://api.cohere.com/v1/rerank";

/// Default rerank model.
const DEFAULT_RERANK_MODEL: &str = "rerank-english-v3.0";

/// Credentials and model selection for the external rerank scorer.
///
/// A missing API key is a valid state: the reranker then degrades to
/// the unranked sentinel instead of calling out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankConfig {
    /// The rerank model name sent with every request.
    pub model: String,
    /// Bearer token for the rerank endpoint. `None` disables reranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// The rerank endpoint URL.
    pub endpoint: String,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_RERANK_MODEL.to_string(),
            api_key: None,
            endpoint: DEFAULT_RERANK_ENDPOINT.to_string(),
        }
    }
}

impl RerankConfig {
    /// Build the config from the environment: `RERANK_API_KEY` for the
    /// credential and `RERANK_MODEL` for an optional model override.
    ///
    /// An unset `RERANK_API_KEY` leaves `api_key` as `None`; the
    /// reranker will run in degraded (unranked) mode.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("RERANK_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(model) = std::env::var("RERANK_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        config
    }

    /// Override the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Pipeline-level defaults applied to every query unless overridden
/// per call.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// The generation model requested from the generator.
    pub model: String,
    /// Default retrieval options.
    pub retrieval: RetrievalOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { model: "gpt-4o-mini".to_string(), retrieval: RetrievalOptions::default() }
    }
}

impl PipelineConfig {
    /// Create a new builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the generation model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the default similarity threshold.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.retrieval.similarity_threshold = threshold;
        self
    }

    /// Set the default per-source result limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.retrieval.limit = limit;
        self
    }

    /// Set whether store metadata is kept on retrieved documents.
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.config.retrieval.include_metadata = include;
        self
    }

    /// Build the config, validating parameter consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the limit is zero or the
    /// threshold is outside `0..=1`.
    pub fn build(self) -> Result<PipelineConfig> {
        if self.config.retrieval.limit == 0 {
            return Err(RagError::ConfigError("limit must be greater than zero".to_string()));
        }
        let threshold = self.config.retrieval.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RagError::ConfigError(format!(
                "similarity_threshold ({threshold}) must be within 0..=1"
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_zero_limit() {
        assert!(PipelineConfig::builder().limit(0).build().is_err());
    }

    #[test]
    fn builder_rejects_out_of_range_threshold() {
        assert!(PipelineConfig::builder().similarity_threshold(1.5).build().is_err());
    }

    #[test]
    fn builder_accepts_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.retrieval.similarity_threshold, 0.3);
        assert!(config.retrieval.include_metadata);
    }

    #[test]
    fn rerank_config_defaults_have_no_key() {
        let config = RerankConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "rerank-english-v3.0");
    }
}
