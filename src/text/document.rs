//! Plain-text documents and the spans that identify their chunks
//!
//! A [`Span`] addresses a chunk as an ordered list of non-overlapping,
//! half-open UTF-16 ranges into the source document. The chunk's text is the
//! concatenation of the addressed substrings.

use super::chunking::{PlainTextSplit, TextSplitter, TextSplitterError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error types for document spans
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Empty text range: {lower_bound}..{upper_bound}")]
    EmptyRange {
        lower_bound: usize,
        upper_bound: usize,
    },

    #[error("Span must contain at least one range")]
    EmptySpan,

    #[error("Ranges are not ordered: {previous} starts after {next}")]
    UnorderedRanges { previous: String, next: String },

    #[error("Ranges overlap: {previous} and {next}")]
    OverlappingRanges { previous: String, next: String },

    #[error("Offset {offset} is out of bounds (length {length})")]
    OutOfBounds { offset: usize, length: usize },

    #[error("Offset {0} does not fall on a character boundary")]
    NotCharBoundary(usize),

    #[error("Split does not track source offsets: {0:?}")]
    UntrackedSplit(String),

    #[error("Span text mismatch: expected {expected:?}, resolved {actual:?}")]
    TextMismatch { expected: String, actual: String },
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Half-open UTF-16 offset range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "(usize, usize)", try_from = "(usize, usize)")]
pub struct TextRange {
    lower_bound: usize,
    upper_bound: usize,
}

impl TextRange {
    pub fn utf16(lower_bound: usize, upper_bound: usize) -> Result<Self> {
        if lower_bound >= upper_bound {
            return Err(DocumentError::EmptyRange {
                lower_bound,
                upper_bound,
            });
        }
        Ok(Self {
            lower_bound,
            upper_bound,
        })
    }

    pub fn lower_bound(&self) -> usize {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> usize {
        self.upper_bound
    }

    pub fn len(&self) -> usize {
        self.upper_bound - self.lower_bound
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.lower_bound < other.upper_bound && other.lower_bound < self.upper_bound
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.lower_bound, self.upper_bound)
    }
}

impl From<TextRange> for (usize, usize) {
    fn from(range: TextRange) -> Self {
        (range.lower_bound, range.upper_bound)
    }
}

impl TryFrom<(usize, usize)> for TextRange {
    type Error = DocumentError;

    fn try_from((lower_bound, upper_bound): (usize, usize)) -> Result<Self> {
        TextRange::utf16(lower_bound, upper_bound)
    }
}

/// Ordered, pairwise non-overlapping ranges
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "Vec<TextRange>", try_from = "Vec<TextRange>")]
pub struct ConsecutiveRanges {
    ranges: Vec<TextRange>,
}

impl ConsecutiveRanges {
    pub fn new(ranges: Vec<TextRange>) -> Result<Self> {
        if ranges.is_empty() {
            return Err(DocumentError::EmptySpan);
        }
        for (previous, next) in ranges.iter().zip(ranges.iter().skip(1)) {
            if previous.overlaps(next) {
                return Err(DocumentError::OverlappingRanges {
                    previous: previous.to_string(),
                    next: next.to_string(),
                });
            }
            if previous.lower_bound > next.lower_bound {
                return Err(DocumentError::UnorderedRanges {
                    previous: previous.to_string(),
                    next: next.to_string(),
                });
            }
        }
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[TextRange] {
        &self.ranges
    }

    pub fn first(&self) -> &TextRange {
        // non-empty by construction
        &self.ranges[0]
    }

    pub fn last(&self) -> &TextRange {
        &self.ranges[self.ranges.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TextRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of UTF-16 code units addressed
    pub fn utf16_len(&self) -> usize {
        self.ranges.iter().map(TextRange::len).sum()
    }
}

impl From<ConsecutiveRanges> for Vec<TextRange> {
    fn from(ranges: ConsecutiveRanges) -> Self {
        ranges.ranges
    }
}

impl TryFrom<Vec<TextRange>> for ConsecutiveRanges {
    type Error = DocumentError;

    fn try_from(ranges: Vec<TextRange>) -> Result<Self> {
        ConsecutiveRanges::new(ranges)
    }
}

impl<'a> IntoIterator for &'a ConsecutiveRanges {
    type Item = &'a TextRange;
    type IntoIter = std::slice::Iter<'a, TextRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ConsecutiveRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{range}")?;
        }
        write!(f, "]")
    }
}

/// Identity of a document chunk. Ordered by its first range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Span(ConsecutiveRanges);

impl Span {
    pub fn new(ranges: ConsecutiveRanges) -> Self {
        Self(ranges)
    }

    pub fn from_ranges(ranges: Vec<TextRange>) -> Result<Self> {
        ConsecutiveRanges::new(ranges).map(Self)
    }

    pub fn ranges(&self) -> &ConsecutiveRanges {
        &self.0
    }

    pub fn into_inner(self) -> ConsecutiveRanges {
        self.0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A span of a document together with its materialized text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequentialSelection {
    span: Span,
    effective_text: String,
}

/// Chunks handed to embedding and indexing are sequential selections.
pub type DocumentChunk = SequentialSelection;

impl SequentialSelection {
    pub fn new(span: Span, effective_text: String) -> Self {
        Self {
            span,
            effective_text,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn text(&self) -> &str {
        &self.effective_text
    }

    pub fn into_parts(self) -> (Span, String) {
        (self.span, self.effective_text)
    }
}

impl fmt::Display for SequentialSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.effective_text)
    }
}

/// A document that represents plain text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlainTextDocument {
    text: String,
}

impl PlainTextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn utf16_len(&self) -> usize {
        self.text.encode_utf16().count()
    }

    /// Materialize the text addressed by `span`
    pub fn selection(&self, span: &Span) -> Result<SequentialSelection> {
        let mut effective_text = String::with_capacity(span.ranges().utf16_len());
        for range in span.ranges() {
            let start = byte_offset(&self.text, range.lower_bound())?;
            let end = byte_offset(&self.text, range.upper_bound())?;
            effective_text.push_str(&self.text[start..end]);
        }
        Ok(SequentialSelection::new(span.clone(), effective_text))
    }

    /// Convert the byte ranges tracked by `split` into a UTF-16 span
    pub fn span_for(&self, split: &PlainTextSplit) -> Result<Span> {
        let byte_ranges = split
            .source_ranges()
            .ok_or_else(|| DocumentError::UntrackedSplit(preview(split.text())))?;
        let ranges = byte_ranges
            .iter()
            .map(|range| {
                TextRange::utf16(
                    utf16_offset(&self.text, range.start)?,
                    utf16_offset(&self.text, range.end)?,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Span::from_ranges(ranges)
    }

    /// Split the document and map every split back to its origin span
    pub fn chunks<S>(&self, splitter: &S) -> std::result::Result<Vec<DocumentChunk>, TextSplitterError>
    where
        S: TextSplitter + ?Sized,
    {
        let splits = splitter.split(&self.text)?;
        let mut chunks = Vec::with_capacity(splits.len());
        for split in splits {
            let span = self.span_for(&split)?;
            let selection = self.selection(&span)?;
            if selection.text() != split.text() {
                return Err(DocumentError::TextMismatch {
                    expected: split.text().to_string(),
                    actual: selection.text().to_string(),
                }
                .into());
            }
            chunks.push(selection);
        }
        tracing::debug!(
            "Resolved {} chunks for document of {} UTF-16 units",
            chunks.len(),
            self.utf16_len()
        );
        Ok(chunks)
    }
}

impl From<String> for PlainTextDocument {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for PlainTextDocument {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for PlainTextDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// UTF-16 offset of the byte offset `byte` in `text`
pub fn utf16_offset(text: &str, byte: usize) -> Result<usize> {
    if byte > text.len() {
        return Err(DocumentError::OutOfBounds {
            offset: byte,
            length: text.len(),
        });
    }
    if !text.is_char_boundary(byte) {
        return Err(DocumentError::NotCharBoundary(byte));
    }
    Ok(text[..byte].encode_utf16().count())
}

/// Byte offset of the UTF-16 offset `utf16` in `text`
pub fn byte_offset(text: &str, utf16: usize) -> Result<usize> {
    let mut units = 0;
    for (byte, c) in text.char_indices() {
        if units == utf16 {
            return Ok(byte);
        }
        units += c.len_utf16();
        if units > utf16 {
            // inside a surrogate pair
            return Err(DocumentError::NotCharBoundary(utf16));
        }
    }
    if units == utf16 {
        Ok(text.len())
    } else {
        Err(DocumentError::OutOfBounds {
            offset: utf16,
            length: units,
        })
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::chunking::{RecursiveCharacterTextSplitter, TextSplitConfiguration};
    use crate::text::tokenizer::CharacterTokenizer;
    use std::sync::Arc;

    fn span(pairs: &[(usize, usize)]) -> Span {
        Span::from_ranges(
            pairs
                .iter()
                .map(|(l, u)| TextRange::utf16(*l, *u).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_text_range_validation() {
        assert!(TextRange::utf16(0, 1).is_ok());
        assert_eq!(
            TextRange::utf16(3, 3),
            Err(DocumentError::EmptyRange {
                lower_bound: 3,
                upper_bound: 3
            })
        );
        assert!(TextRange::utf16(4, 2).is_err());
    }

    #[test]
    fn test_consecutive_ranges_reject_overlap_and_disorder() {
        let a = TextRange::utf16(0, 5).unwrap();
        let b = TextRange::utf16(3, 8).unwrap();
        let c = TextRange::utf16(10, 12).unwrap();

        assert!(matches!(
            ConsecutiveRanges::new(vec![a, b]),
            Err(DocumentError::OverlappingRanges { .. })
        ));
        assert!(matches!(
            ConsecutiveRanges::new(vec![a, a]),
            Err(DocumentError::OverlappingRanges { .. })
        ));
        assert!(matches!(
            ConsecutiveRanges::new(vec![c, a]),
            Err(DocumentError::UnorderedRanges { .. })
        ));
        assert_eq!(ConsecutiveRanges::new(vec![]), Err(DocumentError::EmptySpan));

        let ranges = ConsecutiveRanges::new(vec![a, c]).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges.first(), &a);
        assert_eq!(ranges.last(), &c);
        assert_eq!(ranges.utf16_len(), 7);
        assert_eq!(ranges.to_string(), "[0..5, 10..12]");
    }

    #[test]
    fn test_span_ordering() {
        let mut spans = vec![span(&[(10, 12)]), span(&[(0, 3), (5, 6)]), span(&[(4, 5)])];
        spans.sort();
        assert_eq!(spans[0], span(&[(0, 3), (5, 6)]));
        assert_eq!(spans[1], span(&[(4, 5)]));
        assert_eq!(spans[2], span(&[(10, 12)]));
    }

    #[test]
    fn test_span_serializes_as_pairs() {
        let span = span(&[(0, 3), (5, 9)]);
        let json = serde_json::to_string(&span).unwrap();
        assert_eq!(json, "[[0,3],[5,9]]");

        let decoded: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, span);

        let overlapping = serde_json::from_str::<Span>("[[0,3],[2,9]]");
        assert!(overlapping.is_err());
    }

    #[test]
    fn test_selection_concatenates_ranges() {
        let document = PlainTextDocument::new("Hello, brave new world");
        let selection = document.selection(&span(&[(0, 5), (16, 22)])).unwrap();
        assert_eq!(selection.text(), "Hello world");
        assert_eq!(selection.to_string(), "Hello world");

        let selection = document.selection(&span(&[(7, 12), (17, 22)])).unwrap();
        assert_eq!(selection.text(), "braveworld");

        let out_of_bounds = document.selection(&span(&[(0, 50)]));
        assert!(matches!(out_of_bounds, Err(DocumentError::OutOfBounds { .. })));
    }

    #[test]
    fn test_utf16_offsets() {
        // 😁 is two UTF-16 units and four bytes
        let text = "a😁b";
        assert_eq!(utf16_offset(text, 0).unwrap(), 0);
        assert_eq!(utf16_offset(text, 1).unwrap(), 1);
        assert_eq!(utf16_offset(text, 5).unwrap(), 3);
        assert_eq!(utf16_offset(text, 6).unwrap(), 4);
        assert_eq!(utf16_offset(text, 2), Err(DocumentError::NotCharBoundary(2)));

        assert_eq!(byte_offset(text, 3).unwrap(), 5);
        assert_eq!(byte_offset(text, 4).unwrap(), 6);
        assert_eq!(byte_offset(text, 2), Err(DocumentError::NotCharBoundary(2)));
        assert!(matches!(
            byte_offset(text, 9),
            Err(DocumentError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_span_for_untracked_split() {
        let document = PlainTextDocument::new("text");
        let result = document.span_for(&PlainTextSplit::new("text"));
        assert!(matches!(result, Err(DocumentError::UntrackedSplit(_))));
    }

    #[test]
    fn test_chunks_map_back_to_source() {
        let text = "First paragraph here.\n\nSecond 😁 paragraph is somewhat longer.\n\nThird.";
        let document = PlainTextDocument::new(text);
        let configuration =
            TextSplitConfiguration::new(Some(30), 0, Arc::new(CharacterTokenizer)).unwrap();
        let splitter = RecursiveCharacterTextSplitter::new(configuration);

        let chunks = document.chunks(&splitter).unwrap();
        let splits = splitter.split(text).unwrap();
        assert_eq!(chunks.len(), splits.len());
        for (chunk, split) in chunks.iter().zip(splits.iter()) {
            assert_eq!(chunk.text(), split.text());
            let resolved = document.selection(chunk.span()).unwrap();
            assert_eq!(resolved.text(), chunk.text());
        }

        let mut sorted = chunks.clone();
        sorted.sort();
        assert_eq!(sorted, chunks);
    }
}
