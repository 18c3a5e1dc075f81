//! Semantic text-level chunking.
//!
//! [`SemanticChunker`] splits raw text into retrievable chunks at the
//! coarsest boundary that fits: sections first, sentences for oversized
//! sections, fixed character windows only for a single sentence that
//! exceeds the maximum chunk size on its own.

use crate::error::{RagError, Result};
use crate::splitter::{SectionSplitter, SentenceSplitter, TextSplitter};

/// Options for [`SemanticChunker`].
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticChunkerOptions {
    /// Preferred chunk size in characters; accumulation stops here.
    pub target_chunk_size: usize,
    /// Chunks below this size keep accumulating past the target (but
    /// never past the maximum).
    pub min_chunk_size: usize,
    /// Hard upper bound; only a single atomic sentence can exceed it,
    /// and such sentences are hard-split into windows within the bound.
    pub max_chunk_size: usize,
    /// Number of trailing characters carried into the next chunk.
    pub overlap: usize,
}

impl Default for SemanticChunkerOptions {
    fn default() -> Self {
        Self { target_chunk_size: 1000, min_chunk_size: 500, max_chunk_size: 1500, overlap: 100 }
    }
}

impl SemanticChunkerOptions {
    /// Validate option consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the overlap is not smaller
    /// than the maximum chunk size, or the target exceeds the maximum.
    pub fn validate(&self) -> Result<()> {
        if self.overlap >= self.max_chunk_size {
            return Err(RagError::ConfigError(format!(
                "overlap ({}) must be less than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        if self.target_chunk_size > self.max_chunk_size {
            return Err(RagError::ConfigError(format!(
                "target_chunk_size ({}) must not exceed max_chunk_size ({})",
                self.target_chunk_size, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits raw text into ordered, non-empty, trimmed chunk strings.
///
/// Boundary detection is pluggable: the default strategies are
/// [`SectionSplitter`] and [`SentenceSplitter`], replaceable via
/// [`with_section_splitter`](SemanticChunker::with_section_splitter)
/// and [`with_sentence_splitter`](SemanticChunker::with_sentence_splitter).
pub struct SemanticChunker {
    options: SemanticChunkerOptions,
    section_splitter: Box<dyn TextSplitter>,
    sentence_splitter: Box<dyn TextSplitter>,
}

impl SemanticChunker {
    /// Create a chunker with the given options and default splitters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the options are inconsistent.
    pub fn new(options: SemanticChunkerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            section_splitter: Box::new(SectionSplitter),
            sentence_splitter: Box::new(SentenceSplitter),
        })
    }

    /// Replace the section-boundary strategy.
    pub fn with_section_splitter(mut self, splitter: Box<dyn TextSplitter>) -> Self {
        self.section_splitter = splitter;
        self
    }

    /// Replace the sentence-boundary strategy.
    pub fn with_sentence_splitter(mut self, splitter: Box<dyn TextSplitter>) -> Self {
        self.sentence_splitter = splitter;
        self
    }

    /// Split `text` into chunks.
    ///
    /// Returns an empty `Vec` for blank input, and a single chunk when
    /// the whole normalized text fits within `max_chunk_size`.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = collapse_whitespace(text);
        if text.is_empty() {
            return Vec::new();
        }
        if text.len() <= self.options.max_chunk_size {
            return vec![text];
        }

        let mut acc = Accumulator::new(&self.options);

        for section in self.section_splitter.split(&text) {
            if section.len() > self.options.max_chunk_size {
                // Section cannot fit any chunk; descend to sentences.
                acc.flush();
                for sentence in self.sentence_splitter.split(&section) {
                    if sentence.len() > self.options.max_chunk_size {
                        acc.push_windows(&sentence);
                    } else {
                        acc.push_segment(&sentence, ' ');
                    }
                }
            } else {
                acc.push_segment(&section, '\n');
            }
        }

        acc.finish()
    }
}

/// Greedy segment accumulator with overlap carry between flushed chunks.
struct Accumulator<'a> {
    options: &'a SemanticChunkerOptions,
    chunks: Vec<String>,
    current: String,
    /// Whether `current` holds anything beyond the carried overlap tail.
    has_new: bool,
}

impl<'a> Accumulator<'a> {
    fn new(options: &'a SemanticChunkerOptions) -> Self {
        Self { options, chunks: Vec::new(), current: String::new(), has_new: false }
    }

    /// Append a segment (guaranteed ≤ `max_chunk_size`), flushing first
    /// if it no longer fits the running chunk.
    fn push_segment(&mut self, segment: &str, sep: char) {
        if self.current.is_empty() {
            self.current.push_str(segment);
            self.has_new = true;
            return;
        }

        let combined = self.current.len() + 1 + segment.len();
        let fits_target = combined <= self.options.target_chunk_size;
        let below_min = self.current.len() < self.options.min_chunk_size
            && combined <= self.options.max_chunk_size;

        if !(fits_target || below_min) {
            self.flush();
            // Drop the carried tail if it would push the new chunk past the bound.
            if self.current.len() + 1 + segment.len() > self.options.max_chunk_size {
                self.current.clear();
            }
        }

        if !self.current.is_empty() {
            self.current.push(sep);
        }
        self.current.push_str(segment);
        self.has_new = true;
    }

    /// Hard-split an oversized sentence into fixed windows of
    /// `max_chunk_size`, advancing `max_chunk_size - overlap` per step.
    fn push_windows(&mut self, text: &str) {
        self.flush();

        let max = self.options.max_chunk_size;
        let step = (max - self.options.overlap).max(1);
        let mut start = 0;

        while start < text.len() {
            let end = floor_char_boundary(text, (start + max).min(text.len()));
            self.chunks.push(text[start..end].to_string());
            if end == text.len() {
                break;
            }
            let mut next = floor_char_boundary(text, start + step);
            if next <= start {
                next = ceil_char_boundary(text, start + 1);
            }
            start = next;
        }

        // Seed the next chunk with the tail of the last window.
        self.current = overlap_tail(self.chunks.last().map_or("", String::as_str), self.options.overlap);
        self.has_new = false;
    }

    /// Flush the running chunk and carry its overlap tail forward.
    fn flush(&mut self) {
        if self.has_new {
            let chunk = self.current.trim().to_string();
            if !chunk.is_empty() {
                self.current = overlap_tail(&chunk, self.options.overlap);
                self.chunks.push(chunk);
                self.has_new = false;
                return;
            }
        }
        self.current.clear();
        self.has_new = false;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

/// Collapse horizontal whitespace runs to a single space and runs of
/// blank lines to a single paragraph break, preserving line structure.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        blank_run = 0;
    }

    out
}

/// Largest char boundary at or below `i`.
pub(crate) fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary at or above `i`.
pub(crate) fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// The last `overlap` bytes of `s`, snapped forward to a char boundary.
fn overlap_tail(s: &str, overlap: usize) -> String {
    if overlap == 0 || s.is_empty() {
        return String::new();
    }
    let start = ceil_char_boundary(s, s.len().saturating_sub(overlap));
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(target: usize, min: usize, max: usize, overlap: usize) -> SemanticChunker {
        SemanticChunker::new(SemanticChunkerOptions {
            target_chunk_size: target,
            min_chunk_size: min,
            max_chunk_size: max,
            overlap,
        })
        .unwrap()
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let c = chunker(1000, 500, 1500, 100);
        let chunks = c.chunk("A short paragraph that easily fits.");
        assert_eq!(chunks, vec!["A short paragraph that easily fits."]);
    }

    #[test]
    fn blank_input_yields_no_chunks() {
        let c = chunker(1000, 500, 1500, 100);
        assert!(c.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn sections_accumulate_up_to_target() {
        let c = chunker(100, 20, 150, 10);
        let text =
            "First paragraph with some words.\n\nSecond paragraph with more words.\n\nThird paragraph closes it out and pushes the total length well past the one hundred and fifty character maximum so splitting must occur.";
        let chunks = c.chunk(text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 150, "chunk exceeds max: {}", chunk.len());
        }
    }

    #[test]
    fn oversized_paragraph_splits_at_sentences() {
        let c = chunker(100, 20, 150, 10);
        let sentences: Vec<String> =
            (0..8).map(|i| format!("Sentence number {i} has a fixed amount of words in it.")).collect();
        let text = sentences.join(" ");
        let chunks = c.chunk(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 150);
            // Sentence-level splitting never cuts mid-word.
            assert!(chunk.ends_with('.'), "chunk cut mid-sentence: {chunk:?}");
        }
    }

    #[test]
    fn oversized_sentence_is_hard_split_with_overlap() {
        let c = chunker(100, 20, 150, 10);
        let text = "x".repeat(400);
        let chunks = c.chunk(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= 150);
        }
        // Windows advance by max - overlap, so adjacent windows share 10 chars.
        assert_eq!(chunks[0].len(), 150);
    }

    #[test]
    fn adjacent_chunks_share_overlap_tail() {
        let c = chunker(100, 20, 150, 20);
        let sentences: Vec<String> =
            (0..10).map(|i| format!("This is sentence number {i} in the running text.")).collect();
        let chunks = c.chunk(&sentences.join(" "));
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let tail = overlap_tail(&pair[0], 20);
            assert!(
                pair[1].starts_with(tail.trim_start()),
                "next chunk does not begin with the carried tail"
            );
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let c = chunker(100, 20, 150, 10);
        let text = "Some sentences here. More sentences follow. ".repeat(20);
        assert_eq!(c.chunk(&text), c.chunk(&text));
    }

    #[test]
    fn multibyte_text_never_splits_a_scalar() {
        let c = chunker(100, 20, 150, 10);
        let text = "héllø wörld ünïcode ".repeat(40);
        // Would panic on a non-boundary slice if offsets were not snapped.
        let chunks = c.chunk(&text);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let result = SemanticChunker::new(SemanticChunkerOptions {
            target_chunk_size: 1000,
            min_chunk_size: 500,
            max_chunk_size: 100,
            overlap: 200,
        });
        assert!(result.is_err());
    }

    #[test]
    fn collapse_whitespace_preserves_paragraph_breaks() {
        let s = collapse_whitespace("a   b\t c\n\n\n\nd  e");
        assert_eq!(s, "a b c\n\nd e");
    }
}
