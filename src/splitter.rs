//! Pluggable text-boundary strategies.
//!
//! The [`TextSplitter`] trait isolates boundary detection from chunk
//! assembly, so a regex-driven splitter can later be swapped for a
//! proper tokenizer without touching the chunkers.

use regex::Regex;
use std::sync::LazyLock;

/// A strategy for splitting text at semantic boundaries.
///
/// Implementations return the segments in source order; concatenating
/// them (with single separators) reconstructs the normalized input.
pub trait TextSplitter: Send + Sync {
    /// Split text into non-empty, trimmed segments.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Matches a line that opens a new section: a markdown header, a
/// numbered list start, or a bulleted list start.
static SECTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6}\s|\d+[.)]\s|[-*•]\s)").unwrap());

/// Splits text into sections at markdown headers, list starts, and
/// blank-line paragraph breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionSplitter;

impl TextSplitter for SectionSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current = String::new();
        let mut prev_blank = false;

        for line in text.lines() {
            let trimmed = line.trim();
            let starts_section = SECTION_START.is_match(trimmed);

            if (starts_section || prev_blank) && !current.trim().is_empty() {
                sections.push(current.trim().to_string());
                current.clear();
            }

            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            prev_blank = trimmed.is_empty();
        }

        if !current.trim().is_empty() {
            sections.push(current.trim().to_string());
        }

        sections
    }
}

/// Abbreviations that never end a sentence even when followed by a
/// capitalized word.
const ABBREVIATIONS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Dr", "Prof", "Sr", "Jr", "St", "vs", "etc", "Fig", "No", "Vol", "Inc",
    "Ltd", "Co",
];

/// Splits text at sentence boundaries.
///
/// A boundary is a `.`, `?`, or `!` followed by whitespace and a
/// capital letter. Periods after initials (`J. Smith`), single-letter
/// abbreviations (`e.g.`), and known title abbreviations (`Dr.`) do
/// not end a sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSplitter;

impl SentenceSplitter {
    /// Whether the period at byte offset `idx` terminates an
    /// abbreviation or initial rather than a sentence.
    fn is_abbreviation(text: &str, idx: usize) -> bool {
        let word: String = text[..idx]
            .chars()
            .rev()
            .take_while(|c| c.is_alphabetic())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        if word.chars().count() == 1 {
            // An initial ("J.") or the tail of "e.g." / "i.e.".
            return true;
        }

        ABBREVIATIONS.iter().any(|a| *a == word)
    }
}

impl TextSplitter for SentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut i = 0;

        while i < chars.len() {
            let (idx, c) = chars[i];
            if c == '.' || c == '?' || c == '!' {
                // Scan past the whitespace run following the terminator.
                let mut j = i + 1;
                while j < chars.len() && chars[j].1.is_whitespace() {
                    j += 1;
                }
                let has_whitespace = j > i + 1;
                let next_is_capital = j < chars.len() && chars[j].1.is_uppercase();

                let suppressed = c == '.' && Self::is_abbreviation(text, idx);

                if has_whitespace && next_is_capital && !suppressed {
                    let sentence = text[start..chars[j - 1].0 + chars[j - 1].1.len_utf8()].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence.to_string());
                    }
                    start = chars[j].0;
                    i = j;
                    continue;
                }
            }
            i += 1;
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }

        sentences
    }
}
