//! Property tests for the chunking invariants.

use proptest::prelude::*;
use ragkit::{SemanticChunker, SemanticChunkerOptions};

fn chunker(target: usize, max: usize, overlap: usize) -> SemanticChunker {
    SemanticChunker::new(SemanticChunkerOptions {
        target_chunk_size: target,
        min_chunk_size: target / 2,
        max_chunk_size: max,
        overlap,
    })
    .unwrap()
}

/// Generate prose: words grouped into sentences, sentences into
/// paragraphs separated by blank lines.
fn arb_prose() -> impl Strategy<Value = String> {
    let word = "[a-z]{2,10}";
    let sentence = proptest::collection::vec(word, 3..12).prop_map(|words| {
        let mut s = words.join(" ");
        if let Some(first) = s.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        s.push('.');
        s
    });
    let paragraph = proptest::collection::vec(sentence, 1..8).prop_map(|s| s.join(" "));
    proptest::collection::vec(paragraph, 1..6).prop_map(|p| p.join("\n\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every produced chunk respects the maximum size. Oversized
    /// sentences are hard-split, so the bound holds unconditionally.
    #[test]
    fn chunks_never_exceed_max_size(text in arb_prose()) {
        let c = chunker(120, 180, 20);
        for chunk in c.chunk(&text) {
            prop_assert!(chunk.len() <= 180, "chunk of {} exceeds max", chunk.len());
        }
    }

    /// No chunk is ever empty or pure whitespace.
    #[test]
    fn chunks_are_never_blank(text in arb_prose()) {
        let c = chunker(120, 180, 20);
        for chunk in c.chunk(&text) {
            prop_assert!(!chunk.trim().is_empty());
        }
    }

    /// No content is dropped: every word of the source appears in at
    /// least one chunk.
    #[test]
    fn every_word_survives_chunking(text in arb_prose()) {
        let c = chunker(120, 180, 20);
        let chunks = c.chunk(&text);
        let joined = chunks.join(" ").to_lowercase();
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches('.');
            prop_assert!(joined.contains(word), "word {word:?} was dropped");
        }
    }

    /// Identical input and options give an identical chunk sequence.
    #[test]
    fn chunking_is_deterministic(text in arb_prose()) {
        let c = chunker(120, 180, 20);
        prop_assert_eq!(c.chunk(&text), c.chunk(&text));
    }

    /// Text that fits within the maximum comes back as one chunk.
    #[test]
    fn small_text_is_one_chunk(text in "[a-z ]{1,100}") {
        let c = chunker(120, 180, 20);
        let chunks = c.chunk(&text);
        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
        } else {
            prop_assert_eq!(chunks.len(), 1);
        }
    }
}

/// A 3,000-character single paragraph with the documented options
/// splits into bounded chunks with the boundary region duplicated.
#[test]
fn long_single_paragraph_scenario() {
    let c = SemanticChunker::new(SemanticChunkerOptions {
        target_chunk_size: 1000,
        min_chunk_size: 500,
        max_chunk_size: 1500,
        overlap: 100,
    })
    .unwrap();

    let text = "word ".repeat(600);
    assert!(text.len() >= 3000);

    let chunks = c.chunk(&text);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 1500);
    }
    // Adjacent hard-split windows share the overlap region.
    for pair in chunks.windows(2) {
        let tail: String = pair[0].chars().rev().take(50).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(
            pair[1].contains(tail.trim()),
            "boundary region not duplicated between chunks"
        );
    }
}

/// A paragraph at or under the maximum stays whole.
#[test]
fn paragraph_within_max_is_single_chunk() {
    let c = SemanticChunker::new(SemanticChunkerOptions::default()).unwrap();
    let text = "short sentence here. ".repeat(40);
    assert!(text.len() <= 1500);
    assert_eq!(c.chunk(&text).len(), 1);
}
