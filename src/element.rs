//! Structure-aware chunking over pre-extracted layout elements.
//!
//! [`ElementChunker`] consumes [`DocumentElement`]s carrying page and
//! position metadata and assembles [`Chunk`]s that respect the document
//! structure: elements are grouped per page, ordered by vertical
//! position when every element on the page reports one, segmented at
//! headings, and packed greedily with element-level overlap carry.
//!
//! If anything goes wrong on the smart path, the chunker falls back to
//! a single-pass greedy pass over the raw element list; the fallback
//! never fails.

use std::collections::BTreeMap;

use tracing::warn;

use crate::chunking::{ceil_char_boundary, floor_char_boundary};
use crate::document::{Chunk, DocumentElement};
use crate::error::{RagError, Result};

/// Options for [`ElementChunker`].
#[derive(Debug, Clone, PartialEq)]
pub struct ElementChunkerOptions {
    /// Maximum combined text length per chunk, in characters.
    pub chunk_size: usize,
    /// Minimum combined text length of the elements carried into the
    /// next chunk on overflow.
    pub chunk_overlap: usize,
    /// Use page/position/section structure. When false, a single greedy
    /// pass over the element list is used.
    pub smart_chunking: bool,
}

impl Default for ElementChunkerOptions {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, smart_chunking: true }
    }
}

/// Assembles [`Chunk`]s from layout elements.
#[derive(Debug, Clone)]
pub struct ElementChunker {
    options: ElementChunkerOptions,
}

impl ElementChunker {
    /// Create a chunker with the given options.
    pub fn new(options: ElementChunkerOptions) -> Self {
        Self { options }
    }

    /// Chunk the element list.
    ///
    /// Blank-text elements are ignored. This method never fails: any
    /// error on the smart path is logged and the simple greedy fallback
    /// is used instead.
    pub fn chunk(&self, elements: &[DocumentElement]) -> Vec<Chunk> {
        let non_blank: Vec<&DocumentElement> =
            elements.iter().filter(|e| !e.text.trim().is_empty()).collect();
        if non_blank.is_empty() {
            return Vec::new();
        }

        if self.options.smart_chunking {
            match self.chunk_smart(&non_blank) {
                Ok(chunks) => return chunks,
                Err(e) => {
                    warn!(error = %e, "smart chunking failed, using simple fallback");
                }
            }
        }

        self.chunk_simple(&non_blank)
    }

    /// Page-and-section-aware chunking.
    fn chunk_smart(&self, elements: &[&DocumentElement]) -> Result<Vec<Chunk>> {
        // Group by page, defaulting to page 0; BTreeMap keeps page order.
        let mut pages: BTreeMap<u32, Vec<&DocumentElement>> = BTreeMap::new();
        for element in elements {
            pages.entry(element.metadata.page_number.unwrap_or(0)).or_default().push(element);
        }

        let mut chunks = Vec::new();
        for page_elements in pages.into_values() {
            let ordered = sort_by_position(page_elements);
            for section in split_into_sections(&ordered) {
                self.pack_section(&section, &mut chunks)?;
            }
        }

        if chunks.iter().any(|c| c.text.is_empty()) {
            return Err(RagError::ChunkingError("produced an empty chunk".into()));
        }

        Ok(chunks)
    }

    /// Emit chunks for one section, packing greedily with overlap carry.
    ///
    /// Lengths count the one-char joiner between elements, so assembled
    /// text never exceeds `chunk_size` unless a single atomic element
    /// does (those are hard-split).
    fn pack_section(&self, section: &[&DocumentElement], chunks: &mut Vec<Chunk>) -> Result<()> {
        if joined_len(section) <= self.options.chunk_size {
            if let Some(chunk) = assemble(section) {
                chunks.push(chunk);
            }
            return Ok(());
        }

        let mut current: Vec<&DocumentElement> = Vec::new();
        let mut current_len = 0;

        for element in section {
            if element.text.len() > self.options.chunk_size {
                // An atomic element larger than any chunk: hard-split it.
                if let Some(chunk) = assemble(&current) {
                    chunks.push(chunk);
                }
                current.clear();
                current_len = 0;
                chunks.extend(self.hard_split(element));
                continue;
            }
            if !current.is_empty() && current_len + 1 + element.text.len() > self.options.chunk_size
            {
                if let Some(chunk) = assemble(&current) {
                    chunks.push(chunk);
                }
                current = overlap_suffix(&current, self.options.chunk_overlap);
                current_len = joined_len(&current);
                // The carried suffix plus this element may not fit; the
                // overlap is then dropped rather than overflowing.
                if !current.is_empty()
                    && current_len + 1 + element.text.len() > self.options.chunk_size
                {
                    current.clear();
                    current_len = 0;
                }
            }
            if !current.is_empty() {
                current_len += 1;
            }
            current.push(element);
            current_len += element.text.len();
        }

        if let Some(chunk) = assemble(&current) {
            chunks.push(chunk);
        }
        Ok(())
    }

    /// Single-pass greedy chunking over the unsegmented element list.
    /// Same overflow and overlap policy as the smart path, no structure.
    fn chunk_simple(&self, elements: &[&DocumentElement]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<&DocumentElement> = Vec::new();
        let mut current_len = 0;

        for element in elements {
            if element.text.len() > self.options.chunk_size {
                if let Some(chunk) = assemble(&current) {
                    chunks.push(chunk);
                }
                current.clear();
                current_len = 0;
                chunks.extend(self.hard_split(element));
                continue;
            }
            if !current.is_empty() && current_len + 1 + element.text.len() > self.options.chunk_size
            {
                if let Some(chunk) = assemble(&current) {
                    chunks.push(chunk);
                }
                current = overlap_suffix(&current, self.options.chunk_overlap);
                current_len = joined_len(&current);
                if !current.is_empty()
                    && current_len + 1 + element.text.len() > self.options.chunk_size
                {
                    current.clear();
                    current_len = 0;
                }
            }
            if !current.is_empty() {
                current_len += 1;
            }
            current.push(element);
            current_len += element.text.len();
        }

        if let Some(chunk) = assemble(&current) {
            chunks.push(chunk);
        }
        chunks
    }

    /// Split one oversized element's text into fixed windows of
    /// `chunk_size`, advancing `chunk_size - chunk_overlap` per step.
    /// Every window chunk keeps the element's provenance and metadata.
    fn hard_split(&self, element: &DocumentElement) -> Vec<Chunk> {
        let size = self.options.chunk_size.max(1);
        let step = size.saturating_sub(self.options.chunk_overlap).max(1);
        let text = element.text.trim();

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let end = floor_char_boundary(text, (start + size).min(text.len()));
            let window = DocumentElement { text: text[start..end].to_string(), ..element.clone() };
            if let Some(chunk) = assemble(&[&window]) {
                chunks.push(chunk);
            }
            if end == text.len() {
                break;
            }
            let mut next = floor_char_boundary(text, start + step);
            if next <= start {
                next = ceil_char_boundary(text, start + 1);
            }
            start = next;
        }
        chunks
    }
}

/// Sort a page's elements by vertical position, but only when every
/// element on the page carries one. A page with any element missing
/// `coordinates.y` keeps its original order exactly.
fn sort_by_position<'a>(elements: Vec<&'a DocumentElement>) -> Vec<&'a DocumentElement> {
    let all_positioned = elements.iter().all(|e| e.metadata.coordinates.is_some());
    if !all_positioned {
        return elements;
    }

    let mut sorted = elements;
    sorted.sort_by(|a, b| {
        let ya = a.metadata.coordinates.map(|c| c.y).unwrap_or(0.0);
        let yb = b.metadata.coordinates.map(|c| c.y).unwrap_or(0.0);
        ya.partial_cmp(&yb).unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
}

/// An element starts a new section if it is a heading type, or if it is
/// short text (< 50 chars) that is entirely uppercase, digits, and spaces.
fn starts_section(element: &DocumentElement) -> bool {
    if element.element_type.is_heading() {
        return true;
    }

    let text = element.text.trim();
    text.chars().count() < 50
        && !text.is_empty()
        && text.chars().all(|c| c.is_uppercase() || c.is_ascii_digit() || c == ' ')
}

/// Segment an ordered element sequence at section starts.
fn split_into_sections<'a>(elements: &[&'a DocumentElement]) -> Vec<Vec<&'a DocumentElement>> {
    let mut sections: Vec<Vec<&DocumentElement>> = Vec::new();

    for element in elements {
        if starts_section(element) || sections.is_empty() {
            sections.push(Vec::new());
        }
        sections.last_mut().unwrap().push(element);
    }

    sections.retain(|s| !s.is_empty());
    sections
}

/// Upper bound on the assembled text length of `elements`: the sum of
/// their text lengths plus one joiner char between adjacent elements.
fn joined_len(elements: &[&DocumentElement]) -> usize {
    elements.iter().map(|e| e.text.len()).sum::<usize>() + elements.len().saturating_sub(1)
}

/// The smallest element suffix whose cumulative text length reaches
/// `overlap`, counted from the end.
fn overlap_suffix<'a>(elements: &[&'a DocumentElement], overlap: usize) -> Vec<&'a DocumentElement> {
    if overlap == 0 {
        return Vec::new();
    }

    let mut carried = Vec::new();
    let mut total = 0;
    for element in elements.iter().rev() {
        if total >= overlap {
            break;
        }
        carried.push(*element);
        total += element.text.len();
    }
    carried.reverse();
    carried
}

/// Build a [`Chunk`] from constituent elements: joined text, provenance
/// IDs, de-duplicated types, and shallow-merged metadata (later
/// elements win on key collision).
fn assemble(elements: &[&DocumentElement]) -> Option<Chunk> {
    if elements.is_empty() {
        return None;
    }

    let text = elements.iter().map(|e| e.text.trim()).collect::<Vec<_>>().join("\n");
    if text.trim().is_empty() {
        return None;
    }

    let mut chunk = Chunk {
        text,
        element_ids: elements.iter().map(|e| e.element_id.clone()).collect(),
        element_types: elements.iter().map(|e| e.element_type.as_str().to_string()).collect(),
        metadata: Default::default(),
    };

    for element in elements {
        if let Some(page) = element.metadata.page_number {
            chunk.metadata.insert("page_number".to_string(), page.into());
        }
        for (key, value) in &element.metadata.extra {
            chunk.metadata.insert(key.clone(), value.clone());
        }
    }

    Some(chunk)
}
