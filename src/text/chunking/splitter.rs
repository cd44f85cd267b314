//! Splitter trait and the overlap-aware merge shared by every splitter

use super::config::TextSplitConfiguration;
use super::error::{Result, TextSplitterError};
use super::types::{PlainTextSplit, SplitStatistics};
use crate::text::tokenizer::TokenCountCache;
use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tracing::debug;

/// Splits text into token-bounded chunks
///
/// Splitting is pure: the same configuration and input always produce the
/// same output, and no state survives between calls.
pub trait TextSplitter: Send + Sync {
    fn configuration(&self) -> &TextSplitConfiguration;

    /// Split `text` into chunks. Blank input yields no chunks.
    fn split(&self, text: &str) -> Result<Vec<PlainTextSplit>>;

    /// Greedily pack `splits` into chunks joined by `separator`
    ///
    /// Adjacent chunks share trailing pieces of at most
    /// `maximum_split_overlap` tokens.
    fn merge_splits(
        &self,
        splits: &[PlainTextSplit],
        separator: &str,
    ) -> Result<Vec<PlainTextSplit>> {
        let joiner = PlainTextSplit::new(separator);
        let pieces: Vec<MergePiece> = splits
            .iter()
            .map(|split| MergePiece::new(split.clone(), joiner.clone()))
            .collect();
        SplitMerger::new(self.configuration()).merge(&pieces)
    }

    /// Check that every chunk fits the size budget
    fn validate_top_level(&self, splits: &[PlainTextSplit]) -> Result<()> {
        SplitMerger::new(self.configuration()).validate_top_level(splits)
    }

    /// Split and collect chunk statistics
    fn split_with_statistics(&self, text: &str) -> Result<(Vec<PlainTextSplit>, SplitStatistics)> {
        let start = Instant::now();
        let splits = self.split(text)?;

        let mut merger = SplitMerger::new(self.configuration());
        let mut stats = SplitStatistics::new();
        stats.input_token_count = merger.count(text)?;
        for split in &splits {
            stats.record_chunk(merger.count(split.text())?);
        }
        stats.finish(start.elapsed());
        debug!("{}", stats.summary());
        Ok((splits, stats))
    }
}

/// A piece to merge, with the separator text joining it to the previous piece
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MergePiece {
    pub split: PlainTextSplit,
    pub joiner: PlainTextSplit,
}

impl MergePiece {
    pub fn new(split: PlainTextSplit, joiner: PlainTextSplit) -> Self {
        Self { split, joiner }
    }
}

/// Token-counting state of a single split call
pub(crate) struct SplitMerger<'a> {
    configuration: &'a TextSplitConfiguration,
    counts: TokenCountCache<'a>,
    /// Pieces the splitter could not divide any further
    irreducible: HashSet<PlainTextSplit>,
}

impl<'a> SplitMerger<'a> {
    pub fn new(configuration: &'a TextSplitConfiguration) -> Self {
        Self {
            configuration,
            counts: TokenCountCache::new(configuration.tokenizer().as_ref()),
            irreducible: HashSet::new(),
        }
    }

    pub fn count(&mut self, text: &str) -> Result<usize> {
        Ok(self.counts.count(text)?)
    }

    /// Exempt `split` from the size check of [`Self::validate_top_level`]
    pub fn mark_irreducible(&mut self, split: &PlainTextSplit) {
        self.irreducible.insert(split.clone());
    }

    /// Tokens of the window followed by `next`, counted on the joined text
    fn window_count(
        &mut self,
        pieces: &[MergePiece],
        window: &VecDeque<usize>,
        next: Option<usize>,
    ) -> Result<usize> {
        let mut text = String::new();
        for (position, index) in window.iter().chain(next.iter()).enumerate() {
            let piece = &pieces[*index];
            if position > 0 {
                text.push_str(piece.joiner.text());
            }
            text.push_str(piece.split.text());
        }
        self.count(&text)
    }

    /// Pack pieces into chunks under the budget, carrying overlap forward
    ///
    /// Candidate chunks are counted as joined text, since token counts of
    /// pieces and joiners need not add up.
    pub fn merge(&mut self, pieces: &[MergePiece]) -> Result<Vec<PlainTextSplit>> {
        let Some(max) = self.configuration.maximum_split_size() else {
            return Ok(join_pieces(pieces.iter()).into_iter().collect());
        };
        let overlap = self.configuration.maximum_split_overlap();

        let mut merged = Vec::new();
        let mut window: VecDeque<usize> = VecDeque::new();

        for (index, piece) in pieces.iter().enumerate() {
            let len = self.count(piece.split.text())?;
            if len > max {
                return Err(TextSplitterError::size_exceeded(max, len));
            }

            if !window.is_empty() && self.window_count(pieces, &window, Some(index))? > max {
                if let Some(chunk) = join_pieces(window.iter().map(|i| &pieces[*i])) {
                    merged.push(chunk);
                }
                // keep at most `overlap` tokens of context, and make room for this piece
                while !window.is_empty()
                    && (self.window_count(pieces, &window, None)? > overlap
                        || self.window_count(pieces, &window, Some(index))? > max)
                {
                    window.pop_front();
                }
            }
            window.push_back(index);
        }

        if let Some(chunk) = join_pieces(window.iter().map(|i| &pieces[*i])) {
            merged.push(chunk);
        }
        debug!("Merged {} pieces into {} chunks", pieces.len(), merged.len());
        Ok(merged)
    }

    /// Adjacent chunks of one merged group, except the final pair, must not
    /// fit together in a single chunk.
    pub fn check_granularity(&mut self, group: &[PlainTextSplit], joiner: &str) -> Result<()> {
        let Some(max) = self.configuration.maximum_split_size() else {
            return Ok(());
        };
        if group.len() < 3 {
            return Ok(());
        }
        for pair in group[..group.len() - 1].windows(2) {
            let combined = format!("{}{}{}", pair[0].text(), joiner, pair[1].text());
            if self.count(&combined)? < max {
                return Err(TextSplitterError::TopLevelSplitsMoreGranularThanExpected(
                    group.to_vec(),
                ));
            }
        }
        Ok(())
    }

    /// Every chunk must fit the budget, unless it was marked irreducible
    pub fn validate_top_level(&mut self, splits: &[PlainTextSplit]) -> Result<()> {
        let Some(max) = self.configuration.maximum_split_size() else {
            return Ok(());
        };
        for split in splits {
            if self.irreducible.contains(split) {
                continue;
            }
            let actual = self.count(split.text())?;
            if actual > max {
                return Err(TextSplitterError::size_exceeded(max, actual));
            }
        }
        Ok(())
    }
}

/// Concatenate pieces with their joiners; `None` when nothing is left
pub(crate) fn join_pieces<'p>(mut pieces: impl Iterator<Item = &'p MergePiece>) -> Option<PlainTextSplit> {
    let mut joined = pieces.next()?.split.clone();
    for piece in pieces {
        joined += &piece.joiner;
        joined += &piece.split;
    }
    (!joined.is_empty()).then_some(joined)
}
