//! Balanced bisection splitting
//!
//! An oversized piece is cut in two at the separator boundary closest to its
//! token midpoint, and each half is split again the same way.

use super::config::{Separator, TextSplitConfiguration};
use super::error::{Result, TextSplitterError};
use super::recursive::split_on_separator;
use super::splitter::{SplitMerger, TextSplitter, join_pieces};
use super::types::PlainTextSplit;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct BalancedTextSplitter {
    configuration: TextSplitConfiguration,
    separators: Vec<Separator>,
}

impl BalancedTextSplitter {
    pub fn new(configuration: TextSplitConfiguration) -> Self {
        Self::with_separators(configuration, Separator::defaults())
    }

    pub fn with_separators(configuration: TextSplitConfiguration, separators: Vec<Separator>) -> Self {
        Self {
            configuration,
            separators,
        }
    }

    pub fn separators(&self) -> &[Separator] {
        &self.separators
    }

    fn bisect(
        &self,
        split: &PlainTextSplit,
        tier: usize,
        merger: &mut SplitMerger<'_>,
    ) -> Result<Vec<PlainTextSplit>> {
        let tokens = merger.count(split.text())?;
        if !self.configuration.exceeds(tokens) {
            return Ok(vec![split.clone()]);
        }

        // the search resumes at the current separator, finer ones only when it cannot cut
        for (tier, separator) in self.separators.iter().enumerate().skip(tier) {
            if !separator.applies_to(split.text()) {
                continue;
            }
            let pieces = split_on_separator(split, separator);
            if pieces.len() < 2 {
                continue;
            }

            let counts = pieces
                .iter()
                .enumerate()
                .map(|(index, piece)| -> Result<usize> {
                    let joiner = if index == 0 {
                        0
                    } else {
                        merger.count(piece.joiner.text())?
                    };
                    Ok(merger.count(piece.split.text())? + joiner)
                })
                .collect::<Result<Vec<usize>>>()?;
            let balance = balance_index(&counts);

            let halves = [
                join_pieces(pieces[..=balance].iter()),
                join_pieces(pieces[balance + 1..].iter()),
            ];
            let mut output = Vec::new();
            for half in halves.into_iter().flatten() {
                output.extend(self.bisect(&half, tier, merger)?);
            }
            return Ok(output);
        }

        warn!("Irreducible piece of {} tokens left as is", tokens);
        merger.mark_irreducible(split);
        Ok(vec![split.clone()])
    }
}

/// Index of the last piece of the first half, minimizing
/// `|tokens_before - total / 2|` over the cuts that leave both halves non-empty
fn balance_index(counts: &[usize]) -> usize {
    let half = counts.iter().sum::<usize>() as f64 / 2.0;
    let candidates = counts.len().saturating_sub(1);
    let (balance, _, _) = counts[..candidates].iter().enumerate().fold(
        (0, f64::INFINITY, 0),
        |(best, best_diff, before), (index, count)| {
            let before = before + count;
            let diff = (before as f64 - half).abs();
            if diff < best_diff {
                (index, diff, before)
            } else {
                (best, best_diff, before)
            }
        },
    );
    balance
}

impl TextSplitter for BalancedTextSplitter {
    fn configuration(&self) -> &TextSplitConfiguration {
        &self.configuration
    }

    fn split(&self, text: &str) -> Result<Vec<PlainTextSplit>> {
        let trimmed = PlainTextSplit::from_source(text).trimmed();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let mut merger = SplitMerger::new(&self.configuration);
        let splits = self.bisect(&trimmed, 0, &mut merger)?;
        if splits.is_empty() {
            let tokens = merger.count(trimmed.text())?;
            return Err(TextSplitterError::EmptySplit { tokens });
        }
        merger.validate_top_level(&splits)?;
        debug!("Bisected {} bytes into {} chunks", text.len(), splits.len());
        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenizer::{ByteTokenizer, WhitespaceTokenizer};
    use std::sync::Arc;

    fn texts(splits: &[PlainTextSplit]) -> Vec<&str> {
        splits.iter().map(PlainTextSplit::text).collect()
    }

    #[test]
    fn test_balance_index() {
        assert_eq!(balance_index(&[4, 5, 5, 5]), 1);
        assert_eq!(balance_index(&[10, 1, 1, 1]), 0);
        assert_eq!(balance_index(&[1, 1, 1, 10]), 2);
        // ties keep the earliest cut
        assert_eq!(balance_index(&[2, 2]), 0);
        assert_eq!(balance_index(&[3]), 0);
    }

    #[test]
    fn test_bisects_at_midpoint() {
        let splitter = BalancedTextSplitter::new(
            TextSplitConfiguration::with_maximum_split_size(10).unwrap(),
        );
        let text = "aaaa bbbb cccc dddd";
        let splits = splitter.split(text).unwrap();
        assert_eq!(texts(&splits), vec!["aaaa bbbb", "cccc dddd"]);
        assert_eq!(splits[1].source_ranges(), Some(&[10..19][..]));
    }

    #[test]
    fn test_recursive_bisection_respects_budget() {
        let splitter = BalancedTextSplitter::new(
            TextSplitConfiguration::new(Some(3), 0, Arc::new(WhitespaceTokenizer)).unwrap(),
        );
        let text = "one two three four five six seven eight nine ten";
        let splits = splitter.split(text).unwrap();
        assert_eq!(
            texts(&splits),
            vec!["one two", "three four five", "six seven", "eight nine ten"]
        );
        for split in &splits {
            let resolved: String = split
                .source_ranges()
                .unwrap()
                .iter()
                .map(|r| &text[r.clone()])
                .collect();
            assert_eq!(resolved, split.text());
        }
    }

    #[test]
    fn test_paragraph_boundary_preferred() {
        let splitter = BalancedTextSplitter::new(
            TextSplitConfiguration::with_maximum_split_size(30).unwrap(),
        );
        let text = "First paragraph text.\n\nSecond paragraph text.";
        let splits = splitter.split(text).unwrap();
        assert_eq!(
            texts(&splits),
            vec!["First paragraph text.", "Second paragraph text."]
        );
    }

    #[test]
    fn test_blank_and_small_input() {
        let splitter = BalancedTextSplitter::new(
            TextSplitConfiguration::with_maximum_split_size(30).unwrap(),
        );
        assert!(splitter.split(" \n ").unwrap().is_empty());
        assert_eq!(texts(&splitter.split(" tiny ").unwrap()), vec!["tiny"]);
    }

    #[test]
    fn test_irreducible_piece_is_left_whole() {
        let splitter = BalancedTextSplitter::with_separators(
            TextSplitConfiguration::with_maximum_split_size(4).unwrap(),
            vec![Separator::suffix(" ")],
        );
        assert_eq!(texts(&splitter.split("ab cdefgh").unwrap()), vec!["ab", "cdefgh"]);
    }

    #[test]
    fn test_grapheme_over_byte_budget_is_left_whole() {
        let splitter = BalancedTextSplitter::new(
            TextSplitConfiguration::new(Some(3), 0, Arc::new(ByteTokenizer)).unwrap(),
        );
        let splits = splitter.split("ab\u{1F601}cd").unwrap();
        assert_eq!(texts(&splits), vec!["ab", "\u{1F601}", "cd"]);
    }
}
