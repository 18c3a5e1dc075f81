//! Query analysis: classification and retrieval-budget derivation.
//!
//! The [`QueryAnalyzer`] trait is the seam for an external NLP or LLM
//! classifier. [`HeuristicAnalyzer`] is the built-in default: a keyword
//! classifier that resolves locally, so analysis can never block or
//! fail the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How involved a query is, used to size the retrieval budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryComplexity {
    /// A short, single-clause question.
    Simple,
    /// A multi-clause or mid-length question.
    Moderate,
    /// A long or heavily compound question.
    Complex,
}

/// What the query is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    /// Retrieve a specific fact.
    Lookup,
    /// Aggregate over values (sums, counts, averages).
    Aggregation,
    /// Compare two or more things.
    Comparison,
    /// Summarize a body of content.
    Summary,
    /// Open-ended exploration.
    Exploratory,
}

/// The analysis computed once per query. Immutable; drives both the
/// retrieval strategy choice and generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnalysis {
    /// Complexity classification.
    pub complexity: QueryComplexity,
    /// Intent classification.
    pub intent: QueryIntent,
    /// When true, the orchestrator prefers hybrid retrieval.
    pub is_analytical: bool,
    /// Entity types detected in the query (e.g. `"date"`, `"money"`).
    pub entity_types: Vec<String>,
    /// Upper bound on how many candidates the retriever requests.
    pub search_limit: usize,
}

/// A classifier that turns raw query text into a [`QueryAnalysis`].
///
/// Implementations must always resolve to *some* analysis; a backend
/// failure is handled inside the implementation (for example by
/// falling back to a default classification), never surfaced here.
#[async_trait]
pub trait QueryAnalyzer: Send + Sync {
    /// Analyze a query.
    async fn analyze(&self, query: &str) -> QueryAnalysis;
}

const AGGREGATION_TERMS: &[&str] = &[
    "average", "avg", "sum", "total", "count", "how many", "maximum", "minimum", "median",
    "percentage", "per cent", "group by", "top ", "distribution", "trend", "correlation",
];

const COMPARISON_TERMS: &[&str] = &["compare", "versus", " vs ", "vs.", "difference between"];

const SUMMARY_TERMS: &[&str] = &["summarize", "summarise", "summary", "overview", "key points"];

/// Entity-type keyword table: (entity type, trigger terms).
const ENTITY_TERMS: &[(&str, &[&str])] = &[
    ("date", &["date", "year", "month", "quarter", "when", "since", "before", "after"]),
    ("money", &["revenue", "price", "cost", "sales", "profit", "budget", "$", "spend"]),
    ("person", &["who", "customer", "employee", "user", "author"]),
    ("organization", &["company", "vendor", "organization", "supplier", "team"]),
    ("location", &["where", "country", "region", "city", "location"]),
    ("quantity", &["count", "number of", "quantity", "volume"]),
];

/// Keyword-driven [`QueryAnalyzer`]. Infallible and synchronous under
/// the hood; suitable as the always-available default.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    /// Classify a query without awaiting anything.
    pub fn classify(&self, query: &str) -> QueryAnalysis {
        let lower = query.to_lowercase();
        let words = lower.split_whitespace().count();
        let clauses = 1
            + lower.matches(" and ").count()
            + lower.matches(" or ").count()
            + lower.matches(',').count();

        let complexity = if words < 8 && clauses == 1 {
            QueryComplexity::Simple
        } else if words < 20 && clauses <= 2 {
            QueryComplexity::Moderate
        } else {
            QueryComplexity::Complex
        };

        let is_aggregation = AGGREGATION_TERMS.iter().any(|t| lower.contains(t));
        let intent = if COMPARISON_TERMS.iter().any(|t| lower.contains(t)) {
            QueryIntent::Comparison
        } else if is_aggregation {
            QueryIntent::Aggregation
        } else if SUMMARY_TERMS.iter().any(|t| lower.contains(t)) {
            QueryIntent::Summary
        } else if lower.starts_with("who ")
            || lower.starts_with("what ")
            || lower.starts_with("when ")
            || lower.starts_with("where ")
            || lower.starts_with("which ")
        {
            QueryIntent::Lookup
        } else {
            QueryIntent::Exploratory
        };

        let is_analytical =
            is_aggregation || matches!(intent, QueryIntent::Aggregation | QueryIntent::Comparison);

        let entity_types = ENTITY_TERMS
            .iter()
            .filter(|(_, terms)| terms.iter().any(|t| lower.contains(t)))
            .map(|(name, _)| name.to_string())
            .collect();

        let search_limit = match complexity {
            QueryComplexity::Simple => 5,
            QueryComplexity::Moderate => 10,
            QueryComplexity::Complex => 15,
        };

        QueryAnalysis { complexity, intent, is_analytical, entity_types, search_limit }
    }
}

#[async_trait]
impl QueryAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, query: &str) -> QueryAnalysis {
        self.classify(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_queries_are_analytical() {
        let analysis = HeuristicAnalyzer.classify("What is the total revenue per region?");
        assert!(analysis.is_analytical);
        assert_eq!(analysis.intent, QueryIntent::Aggregation);
        assert!(analysis.entity_types.contains(&"money".to_string()));
    }

    #[test]
    fn short_lookup_queries_are_simple() {
        let analysis = HeuristicAnalyzer.classify("Who wrote this report?");
        assert_eq!(analysis.complexity, QueryComplexity::Simple);
        assert_eq!(analysis.intent, QueryIntent::Lookup);
        assert!(!analysis.is_analytical);
        assert_eq!(analysis.search_limit, 5);
    }

    #[test]
    fn long_compound_queries_are_complex() {
        let analysis = HeuristicAnalyzer.classify(
            "Compare the sales figures for the northern region and the southern region, \
             broken down by month, and explain which vendor contributed most to the change",
        );
        assert_eq!(analysis.complexity, QueryComplexity::Complex);
        assert_eq!(analysis.intent, QueryIntent::Comparison);
        assert!(analysis.is_analytical);
        assert_eq!(analysis.search_limit, 15);
    }

    #[test]
    fn analysis_always_resolves() {
        let analysis = HeuristicAnalyzer.classify("");
        assert_eq!(analysis.complexity, QueryComplexity::Simple);
        assert_eq!(analysis.search_limit, 5);
    }
}
