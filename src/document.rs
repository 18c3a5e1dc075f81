//! Data types for layout elements, chunks, and retrieval candidates.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// The layout role of a [`DocumentElement`], as reported by upstream extraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementType {
    /// A document or section title.
    Title,
    /// A page or section header.
    Header,
    /// An explicit section header.
    SectionHeader,
    /// A heading of any level.
    Heading,
    /// Body prose.
    NarrativeText,
    /// An item in a bulleted or numbered list.
    ListItem,
    /// Tabular content.
    Table,
    /// A caption attached to a figure.
    FigureCaption,
    /// Any type not covered above, preserved verbatim.
    Other(String),
}

impl ElementType {
    /// The canonical string form of this element type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "Title",
            Self::Header => "Header",
            Self::SectionHeader => "SectionHeader",
            Self::Heading => "Heading",
            Self::NarrativeText => "NarrativeText",
            Self::ListItem => "ListItem",
            Self::Table => "Table",
            Self::FigureCaption => "FigureCaption",
            Self::Other(s) => s,
        }
    }

    /// Whether this type marks the start of a new section during
    /// structure-aware chunking.
    pub fn is_heading(&self) -> bool {
        matches!(self, Self::Title | Self::Header | Self::SectionHeader | Self::Heading)
    }
}

impl From<String> for ElementType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Title" => Self::Title,
            "Header" => Self::Header,
            "SectionHeader" => Self::SectionHeader,
            "Heading" => Self::Heading,
            "NarrativeText" => Self::NarrativeText,
            "ListItem" => Self::ListItem,
            "Table" => Self::Table,
            "FigureCaption" => Self::FigureCaption,
            _ => Self::Other(s),
        }
    }
}

impl From<ElementType> for String {
    fn from(t: ElementType) -> Self {
        t.as_str().to_string()
    }
}

/// A position on the page, in extraction-native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset (increases downward).
    pub y: f64,
}

/// Metadata attached to a [`DocumentElement`] by upstream extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
    /// The page the element appears on, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// The element's position on the page, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Any additional extraction metadata, preserved verbatim.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single layout element produced by upstream document extraction.
///
/// Elements are the immutable input to structure-aware chunking; this
/// crate never produces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentElement {
    /// Unique identifier for the element.
    pub element_id: String,
    /// The layout role of the element.
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// The element's text content.
    pub text: String,
    /// Extraction metadata (page, position, and passthrough fields).
    #[serde(default)]
    pub metadata: ElementMetadata,
}

/// A bounded text unit with provenance, the unit indexed by the vector store.
///
/// One chunk aggregates one or more contiguous elements (structure-aware
/// path) or one text segment (semantic path). `text` is never empty;
/// `element_ids` traces the chunk back to its source elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk's text content. Never empty.
    pub text: String,
    /// IDs of the elements this chunk was assembled from, in order.
    pub element_ids: Vec<String>,
    /// The de-duplicated set of constituent element types.
    pub element_types: BTreeSet<String>,
    /// Shallow merge of all constituent elements' metadata. Later
    /// elements overwrite earlier ones on key collision.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A retrieval candidate returned by the vector store, annotated with
/// the data source it came from.
///
/// `content` is never mutated downstream; `metadata` may be enriched by
/// the metadata enhancer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The document's text content.
    pub content: String,
    /// The data source this document was retrieved from. Always
    /// populated so provenance survives multi-source fusion.
    pub source_id: String,
    /// Similarity to the query in `0..=1`, higher is a better match.
    pub similarity: f32,
    /// Key-value metadata from the store, possibly enriched downstream.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_round_trips_through_string() {
        let t = ElementType::from("SectionHeader".to_string());
        assert_eq!(t, ElementType::SectionHeader);
        assert_eq!(String::from(t), "SectionHeader");

        let custom = ElementType::from("PageBreak".to_string());
        assert_eq!(custom, ElementType::Other("PageBreak".to_string()));
        assert_eq!(custom.as_str(), "PageBreak");
    }

    #[test]
    fn heading_types_are_section_starts() {
        assert!(ElementType::Title.is_heading());
        assert!(ElementType::Heading.is_heading());
        assert!(!ElementType::NarrativeText.is_heading());
        assert!(!ElementType::Other("PageBreak".into()).is_heading());
    }
}
