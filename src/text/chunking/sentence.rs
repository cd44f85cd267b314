//! Sentence packing
//!
//! Whole sentences from a [`SentenceSegmenter`] are packed into chunks under
//! the budget. Sentences that are too long on their own go through the
//! recursive splitter.

use super::config::TextSplitConfiguration;
use super::error::{Result, TextSplitterError};
use super::recursive::RecursiveCharacterTextSplitter;
use super::splitter::{MergePiece, SplitMerger, TextSplitter};
use super::types::PlainTextSplit;
use crate::text::segmenter::{PunctuationSegmenter, SentenceSegmenter};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SentenceTextSplitter<S = PunctuationSegmenter> {
    configuration: TextSplitConfiguration,
    segmenter: S,
    fallback: RecursiveCharacterTextSplitter,
}

impl SentenceTextSplitter<PunctuationSegmenter> {
    pub fn new(configuration: TextSplitConfiguration) -> Self {
        Self::with_segmenter(configuration, PunctuationSegmenter::default())
    }
}

impl<S: SentenceSegmenter> SentenceTextSplitter<S> {
    pub fn with_segmenter(configuration: TextSplitConfiguration, segmenter: S) -> Self {
        let fallback = RecursiveCharacterTextSplitter::new(configuration.clone());
        Self {
            configuration,
            segmenter,
            fallback,
        }
    }

    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    /// Trimmed sentences, each with the whitespace gap before it as joiner
    fn sentence_pieces(&self, source: &PlainTextSplit) -> Vec<MergePiece> {
        let text = source.text();
        let mut pieces = Vec::new();
        let mut previous_end = 0;
        for range in self.segmenter.sentences(text) {
            let sentence = &text[range.clone()];
            let start = range.start + (sentence.len() - sentence.trim_start().len());
            let end = range.start + sentence.trim_end().len();
            if start >= end {
                continue;
            }
            let joiner = source.slice(previous_end.min(start)..start);
            pieces.push(MergePiece::new(source.slice(start..end), joiner));
            previous_end = end;
        }
        pieces
    }
}

impl<S: SentenceSegmenter> TextSplitter for SentenceTextSplitter<S> {
    fn configuration(&self) -> &TextSplitConfiguration {
        &self.configuration
    }

    fn split(&self, text: &str) -> Result<Vec<PlainTextSplit>> {
        let source = PlainTextSplit::from_source(text);
        if source.is_blank() {
            return Ok(Vec::new());
        }

        let mut merger = SplitMerger::new(&self.configuration);
        let mut output = Vec::new();
        let mut pending: Vec<MergePiece> = Vec::new();
        let pieces = self.sentence_pieces(&source);
        let sentence_count = pieces.len();
        for piece in pieces {
            let tokens = merger.count(piece.split.text())?;
            if self.configuration.exceeds(tokens) {
                output.extend(merger.merge(&pending)?);
                pending.clear();
                output.extend(self.fallback.split_recursive(&piece.split, 0, &mut merger)?);
            } else {
                pending.push(piece);
            }
        }
        output.extend(merger.merge(&pending)?);

        if output.is_empty() {
            let tokens = merger.count(text.trim())?;
            return Err(TextSplitterError::EmptySplit { tokens });
        }
        merger.validate_top_level(&output)?;
        debug!(
            "Packed {} sentences into {} chunks",
            sentence_count,
            output.len()
        );
        Ok(output)
    }
}
