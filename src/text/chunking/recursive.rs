//! Recursive separator-based splitting
//!
//! Text is split on the coarsest separator that occurs in it; pieces that
//! fit the budget are merged back together, oversized pieces are split again
//! with the next, finer separator.

use super::config::{Separator, SeparatorAffinity, TextSplitConfiguration};
use super::error::{Result, TextSplitterError};
use super::splitter::{MergePiece, SplitMerger, TextSplitter};
use super::types::PlainTextSplit;
use std::ops::Range;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

/// Default splitter: paragraphs, then lines, then words, then graphemes
#[derive(Debug, Clone)]
pub struct RecursiveCharacterTextSplitter {
    configuration: TextSplitConfiguration,
    separators: Vec<Separator>,
}

impl RecursiveCharacterTextSplitter {
    pub fn new(configuration: TextSplitConfiguration) -> Self {
        Self::with_separators(configuration, Separator::defaults())
    }

    /// Separators are tried in order, coarsest first
    pub fn with_separators(configuration: TextSplitConfiguration, separators: Vec<Separator>) -> Self {
        Self {
            configuration,
            separators,
        }
    }

    pub fn separators(&self) -> &[Separator] {
        &self.separators
    }

    pub(crate) fn split_recursive(
        &self,
        split: &PlainTextSplit,
        tier: usize,
        merger: &mut SplitMerger<'_>,
    ) -> Result<Vec<PlainTextSplit>> {
        let tokens = merger.count(split.text())?;
        if !self.configuration.exceeds(tokens) {
            return Ok(vec![split.clone()]);
        }
        let Some((tier, separator)) = applicable_separator(&self.separators, tier, split.text())
        else {
            warn!("Irreducible piece of {} tokens left as is", tokens);
            merger.mark_irreducible(split);
            return Ok(vec![split.clone()]);
        };

        let mut output = Vec::new();
        let mut pending: Vec<MergePiece> = Vec::new();
        for piece in split_on_separator(split, separator) {
            let piece_tokens = merger.count(piece.split.text())?;
            if self.configuration.exceeds(piece_tokens) {
                flush(&mut pending, separator, merger, &mut output)?;
                output.extend(self.split_recursive(&piece.split, tier + 1, merger)?);
            } else {
                pending.push(piece);
            }
        }
        flush(&mut pending, separator, merger, &mut output)?;
        Ok(output)
    }
}

impl TextSplitter for RecursiveCharacterTextSplitter {
    fn configuration(&self) -> &TextSplitConfiguration {
        &self.configuration
    }

    fn split(&self, text: &str) -> Result<Vec<PlainTextSplit>> {
        let trimmed = PlainTextSplit::from_source(text).trimmed();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let mut merger = SplitMerger::new(&self.configuration);
        let splits = self.split_recursive(&trimmed, 0, &mut merger)?;
        if splits.is_empty() {
            let tokens = merger.count(trimmed.text())?;
            return Err(TextSplitterError::EmptySplit { tokens });
        }
        merger.validate_top_level(&splits)?;
        debug!("Split {} bytes into {} chunks", text.len(), splits.len());
        Ok(splits)
    }
}

/// First separator at or after `tier` that occurs in `text`
pub(crate) fn applicable_separator<'s>(
    separators: &'s [Separator],
    tier: usize,
    text: &str,
) -> Option<(usize, &'s Separator)> {
    separators
        .iter()
        .enumerate()
        .skip(tier)
        .find(|(_, separator)| separator.applies_to(text))
}

/// Split into trimmed, non-blank pieces, each remembering the source of the
/// joiner that precedes it
pub(crate) fn split_on_separator(split: &PlainTextSplit, separator: &Separator) -> Vec<MergePiece> {
    segment_ranges(split.text(), separator)
        .into_iter()
        .filter_map(|(segment, joiner)| {
            let piece = split.slice(segment).trimmed();
            (!piece.is_empty()).then(|| MergePiece::new(piece, split.slice(joiner)))
        })
        .collect()
}

/// Local byte ranges of the segments, separators attached per affinity,
/// each paired with the range of the joiner before it
fn segment_ranges(text: &str, separator: &Separator) -> Vec<(Range<usize>, Range<usize>)> {
    if separator.is_empty() {
        return text
            .grapheme_indices(true)
            .map(|(start, grapheme)| (start..start + grapheme.len(), start..start))
            .collect();
    }

    let mut segments = Vec::new();
    let mut start = 0;
    let mut joiner = 0..0;
    for found in separator.find_in(text) {
        let joiner_len = separator.joiner_of(&text[found.clone()]).len();
        match separator.affinity {
            SeparatorAffinity::Suffix => {
                segments.push((start..found.end, joiner));
                joiner = found.end - joiner_len..found.end;
                start = found.end;
            }
            SeparatorAffinity::Prefix => {
                if found.start > start {
                    segments.push((start..found.start, joiner));
                }
                joiner = found.start..found.start + joiner_len;
                start = found.start;
            }
        }
    }
    if start < text.len() {
        segments.push((start..text.len(), joiner));
    }
    segments
}

fn flush(
    pending: &mut Vec<MergePiece>,
    separator: &Separator,
    merger: &mut SplitMerger<'_>,
    output: &mut Vec<PlainTextSplit>,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let merged = merger.merge(pending)?;
    merger.check_granularity(&merged, separator.joiner())?;
    output.extend(merged);
    pending.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenizer::{ByteTokenizer, CharacterTokenizer, WhitespaceTokenizer};
    use itertools::Itertools;
    use std::sync::Arc;

    fn character_splitter(max: usize, overlap: usize) -> RecursiveCharacterTextSplitter {
        RecursiveCharacterTextSplitter::new(
            TextSplitConfiguration::new(Some(max), overlap, Arc::new(CharacterTokenizer)).unwrap(),
        )
    }

    fn texts(splits: &[PlainTextSplit]) -> Vec<&str> {
        splits.iter().map(PlainTextSplit::text).collect()
    }

    fn assert_spans_resolve(source: &str, splits: &[PlainTextSplit]) {
        for split in splits {
            let ranges = split.source_ranges().unwrap();
            let resolved: String = ranges.iter().map(|r| &source[r.clone()]).collect();
            assert_eq!(resolved, split.text());
        }
    }

    #[test]
    fn test_blank_input() {
        let splitter = character_splitter(10, 0);
        assert!(splitter.split("").unwrap().is_empty());
        assert!(splitter.split("  \n\n\t ").unwrap().is_empty());
    }

    #[test]
    fn test_small_input_is_single_trimmed_chunk() {
        let splitter = character_splitter(50, 0);
        let splits = splitter.split("  short text\n").unwrap();
        assert_eq!(texts(&splits), vec!["short text"]);
        assert_eq!(splits[0].source_ranges(), Some(&[2..12][..]));
    }

    #[test]
    fn test_unbounded_returns_trimmed_input() {
        let splitter = RecursiveCharacterTextSplitter::new(TextSplitConfiguration::unbounded());
        let text = "\n First paragraph.\n\nSecond paragraph with more words.  ";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec![text.trim()]);
    }

    #[test]
    fn test_paragraphs_split_first() {
        let splitter = character_splitter(20, 0);
        let text = "Paragraph number one\n\nParagraph two";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["Paragraph number one", "Paragraph two"]);
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_small_paragraphs_are_merged() {
        let splitter = character_splitter(12, 0);
        let text = "aa\n\nbb\n\ncc\n\ndd dd dd dd";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["aa\n\nbb\n\ncc", "dd dd dd dd"]);
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_oversized_paragraph_recurses_to_words() {
        let splitter = RecursiveCharacterTextSplitter::new(
            TextSplitConfiguration::new(Some(5), 0, Arc::new(WhitespaceTokenizer)).unwrap(),
        );
        let text = "Paragraph one.\n\nParagraph two is much longer than the budget allows and must be recursively divided further.";
        let splits = splitter.split(text).unwrap();
        assert_eq!(
            texts(&splits),
            vec![
                "Paragraph one.",
                "Paragraph two is much longer",
                "than the budget allows and",
                "must be recursively divided further.",
            ]
        );
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_long_word_falls_back_to_graphemes() {
        let splitter = character_splitter(4, 0);
        let text = "ab abcdefghij";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["ab", "abcd", "efgh", "ij"]);
        for split in &splits {
            assert!(split.text().chars().count() <= 4);
        }
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_grapheme_clusters_are_never_split() {
        let splitter = character_splitter(2, 0);
        let text = "e\u{301}e\u{301}e\u{301}";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["e\u{301}e\u{301}", "e\u{301}"]);
    }

    #[test]
    fn test_overlap_between_chunks() {
        let splitter = RecursiveCharacterTextSplitter::new(
            TextSplitConfiguration::new(Some(4), 1, Arc::new(WhitespaceTokenizer)).unwrap(),
        );
        let text = "a b c d e f g h";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["a b c d", "d e f g", "g h"]);
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_budget_and_granularity_invariants() {
        let splitter = character_splitter(40, 0);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(12);
        let splits = splitter.split(&text).unwrap();
        assert!(splits.len() > 3);
        for split in &splits {
            assert!(split.text().chars().count() <= 40);
            assert!(!split.text().trim().is_empty());
        }
        // every adjacent pair except the final one
        for (a, b) in splits[..splits.len() - 1].iter().tuple_windows() {
            assert!(format!("{} {}", a.text(), b.text()).chars().count() >= 40);
        }
        assert_spans_resolve(&text, &splits);
    }

    #[test]
    fn test_deterministic() {
        let splitter = character_splitter(16, 3);
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\nSed do eiusmod tempor.";
        assert_eq!(splitter.split(text).unwrap(), splitter.split(text).unwrap());
    }

    #[test]
    fn test_irreducible_piece_is_left_whole() {
        let splitter = RecursiveCharacterTextSplitter::with_separators(
            TextSplitConfiguration::with_maximum_split_size(5).unwrap(),
            vec![Separator::suffix(" ")],
        );
        let splits = splitter.split("tiny enormousword").unwrap();
        assert_eq!(texts(&splits), vec!["tiny", "enormousword"]);
    }

    #[test]
    fn test_grapheme_over_byte_budget_is_left_whole() {
        let splitter = RecursiveCharacterTextSplitter::new(
            TextSplitConfiguration::new(Some(3), 0, Arc::new(ByteTokenizer)).unwrap(),
        );
        let text = "ab\u{1F601}cd";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["ab", "\u{1F601}", "cd"]);
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_tab_separated_words() {
        let splitter = RecursiveCharacterTextSplitter::new(
            TextSplitConfiguration::new(Some(2), 0, Arc::new(WhitespaceTokenizer)).unwrap(),
        );
        let text = "alpha\tbeta\tgamma";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["alpha\tbeta", "gamma"]);
        assert_spans_resolve(text, &splits);

        let text = "one\u{a0}two three\t\tfour five";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["one\u{a0}two", "three\t\tfour", "five"]);
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_prefix_separator_keeps_heading_with_section() {
        let splitter = RecursiveCharacterTextSplitter::with_separators(
            TextSplitConfiguration::with_maximum_split_size(24).unwrap(),
            vec![Separator::prefix("\n## "), Separator::suffix(" "), Separator::suffix("")],
        );
        let text = "Intro text\n## First\nbody one\n## Second\nbody two";
        let splits = splitter.split(text).unwrap();
        assert_eq!(
            texts(&splits),
            vec!["Intro text", "## First\nbody one", "## Second\nbody two"]
        );
        assert_spans_resolve(text, &splits);
    }

    #[test]
    fn test_segment_ranges() {
        let segments = |text, separator| -> Vec<Range<usize>> {
            segment_ranges(text, &separator)
                .into_iter()
                .map(|(segment, _)| segment)
                .collect()
        };
        let text = "a--b--c";
        assert_eq!(segments(text, Separator::suffix("--")), vec![0..3, 3..6, 6..7]);
        assert_eq!(segments(text, Separator::prefix("--")), vec![0..1, 1..4, 4..7]);
        assert_eq!(segments("ab", Separator::suffix("")), vec![0..1, 1..2]);
        assert_eq!(segments("x--", Separator::suffix("--")), vec![0..3]);
    }

    #[test]
    fn test_joiners_follow_matched_whitespace() {
        let text = "alpha\tbeta \n gamma";
        assert_eq!(
            segment_ranges(text, &Separator::suffix(Separator::WORD)),
            vec![(0..6, 0..0), (6..13, 5..6), (13..18, 10..13)]
        );

        let text = "intro\n## a\n## b";
        assert_eq!(
            segment_ranges(text, &Separator::prefix("\n## ")),
            vec![(0..5, 0..0), (5..10, 5..6), (10..15, 10..11)]
        );
    }

    #[test]
    fn test_applicable_separator_resumes_at_tier() {
        let separators = Separator::defaults();
        let found = applicable_separator(&separators, 0, "a b");
        assert_eq!(found.map(|(tier, _)| tier), Some(2));
        let found = applicable_separator(&separators, 3, "a\n\nb");
        assert_eq!(found.map(|(tier, _)| tier), Some(3));
        assert!(applicable_separator(&separators, 4, "a b").is_none());
    }
}
