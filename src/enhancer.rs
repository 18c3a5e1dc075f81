//! Best-effort metadata enrichment over a retrieved document set.
//!
//! [`MetadataEnhancer`] groups retrieved documents by source, asks the
//! [`MetadataExtractor`] collaborator for aggregate statistics over a
//! bounded sample of each group, and merges the result into each
//! document's `enhancedMetadata`. Enhancement never fails the caller:
//! on any error the original documents are returned untouched.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::document::Document;
use crate::error::Result;

/// The metadata key the aggregate statistics are merged under.
const ENHANCED_KEY: &str = "enhancedMetadata";

/// Per-group sample cap sent to the extractor.
const SAMPLE_LIMIT: usize = 100;

/// An external collaborator that computes aggregate statistics
/// (numeric ranges, entity frequencies, unique/common values) over a
/// sample of documents from one source.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Extract aggregate metadata for one source group.
    ///
    /// `source_type` is the inferred kind of the source (`"pdf"`,
    /// `"snowflake"`, `"file"`, ...); `sample` holds at most 100
    /// documents from the group.
    async fn extract(
        &self,
        source_type: &str,
        query: &str,
        sample: &[&Document],
    ) -> Result<serde_json::Value>;
}

/// Best-effort enrichment stage.
pub struct MetadataEnhancer {
    extractor: Arc<dyn MetadataExtractor>,
}

impl MetadataEnhancer {
    /// Create an enhancer over the given extractor.
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { extractor }
    }

    /// Enrich the documents' metadata with per-source aggregates.
    ///
    /// Document order and content are preserved. If extraction fails
    /// for any group, the *original* documents are returned with no
    /// partial mutation, and the error is logged.
    pub async fn enhance(&self, documents: Vec<Document>, query: &str) -> Vec<Document> {
        if documents.is_empty() {
            return documents;
        }

        match self.try_enhance(&documents, query).await {
            Ok(enhanced) => enhanced,
            Err(e) => {
                error!(error = %e, "metadata enhancement failed, returning documents unenhanced");
                documents
            }
        }
    }

    async fn try_enhance(&self, documents: &[Document], query: &str) -> Result<Vec<Document>> {
        // Group indices by source so the output keeps the input order.
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, doc) in documents.iter().enumerate() {
            groups.entry(doc.source_id.as_str()).or_default().push(i);
        }

        let mut enhanced = documents.to_vec();
        for indices in groups.values() {
            let group: Vec<&Document> = indices.iter().map(|&i| &documents[i]).collect();
            let source_type = infer_source_type(&group);
            let sample = &group[..group.len().min(SAMPLE_LIMIT)];

            let aggregates = self.extractor.extract(&source_type, query, sample).await?;
            for &i in indices {
                enhanced[i].metadata.insert(ENHANCED_KEY.to_string(), aggregates.clone());
            }
        }

        info!(documents = enhanced.len(), groups = groups.len(), "metadata enhancement completed");
        Ok(enhanced)
    }
}

/// Infer the kind of source a document group came from.
///
/// Priority: explicit `sourceType` → `fileType` substring → `database`
/// substring → `"file"`.
fn infer_source_type(group: &[&Document]) -> String {
    for doc in group {
        if let Some(explicit) = doc.metadata.get("sourceType").and_then(|v| v.as_str()) {
            return explicit.to_lowercase();
        }
    }

    for doc in group {
        if let Some(file_type) = doc.metadata.get("fileType").and_then(|v| v.as_str()) {
            let lower = file_type.to_lowercase();
            for kind in ["pdf", "docx", "doc", "xlsx", "xls", "csv"] {
                if lower.contains(kind) {
                    return kind.to_string();
                }
            }
        }
    }

    for doc in group {
        if let Some(database) = doc.metadata.get("database").and_then(|v| v.as_str()) {
            let lower = database.to_lowercase();
            if lower.contains("snowflake") {
                return "snowflake".to_string();
            }
            if lower.contains("postgres") || lower.contains("pg") {
                return "postgres".to_string();
            }
            if lower.contains("mysql") {
                return "mysql".to_string();
            }
        }
    }

    "file".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    struct FixedExtractor;

    #[async_trait]
    impl MetadataExtractor for FixedExtractor {
        async fn extract(
            &self,
            source_type: &str,
            _query: &str,
            sample: &[&Document],
        ) -> Result<serde_json::Value> {
            Ok(serde_json::json!({ "sourceType": source_type, "sampleSize": sample.len() }))
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl MetadataExtractor for FailingExtractor {
        async fn extract(
            &self,
            _source_type: &str,
            _query: &str,
            _sample: &[&Document],
        ) -> Result<serde_json::Value> {
            Err(RagError::PipelineError("extractor offline".into()))
        }
    }

    fn doc(id: &str, source: &str) -> Document {
        Document {
            id: id.to_string(),
            content: "content".to_string(),
            source_id: source.to_string(),
            similarity: 0.9,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn enrichment_merges_aggregates_per_group() {
        let enhancer = MetadataEnhancer::new(Arc::new(FixedExtractor));
        let docs = vec![doc("1", "A"), doc("2", "B"), doc("3", "A")];
        let enhanced = enhancer.enhance(docs, "query").await;

        assert_eq!(enhanced.len(), 3);
        // Order is preserved and every document carries the aggregates.
        assert_eq!(enhanced[0].id, "1");
        assert_eq!(enhanced[1].id, "2");
        for d in &enhanced {
            let agg = &d.metadata[ENHANCED_KEY];
            assert_eq!(agg["sourceType"], "file");
        }
        assert_eq!(enhanced[0].metadata[ENHANCED_KEY]["sampleSize"], 2);
        assert_eq!(enhanced[1].metadata[ENHANCED_KEY]["sampleSize"], 1);
    }

    #[tokio::test]
    async fn failure_returns_originals_unchanged() {
        let enhancer = MetadataEnhancer::new(Arc::new(FailingExtractor));
        let docs = vec![doc("1", "A"), doc("2", "B")];
        let enhanced = enhancer.enhance(docs.clone(), "query").await;
        assert_eq!(enhanced, docs);
        assert!(enhanced.iter().all(|d| !d.metadata.contains_key(ENHANCED_KEY)));
    }

    #[tokio::test]
    async fn empty_input_is_returned_as_is() {
        let enhancer = MetadataEnhancer::new(Arc::new(FixedExtractor));
        assert!(enhancer.enhance(Vec::new(), "query").await.is_empty());
    }

    #[test]
    fn source_type_inference_priority() {
        let mut pdf = doc("1", "A");
        pdf.metadata.insert("fileType".to_string(), serde_json::json!("application/pdf"));
        assert_eq!(infer_source_type(&[&pdf]), "pdf");

        let mut explicit = pdf.clone();
        explicit.metadata.insert("sourceType".to_string(), serde_json::json!("snowflake"));
        assert_eq!(infer_source_type(&[&explicit]), "snowflake");

        let mut db = doc("2", "A");
        db.metadata.insert("database".to_string(), serde_json::json!("PostgreSQL 14"));
        assert_eq!(infer_source_type(&[&db]), "postgres");

        assert_eq!(infer_source_type(&[&doc("3", "A")]), "file");
    }
}
