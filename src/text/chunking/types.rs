//! Core data structures for text splitting

use std::fmt;
use std::ops::{Add, AddAssign, Range};
use std::time::Duration;

/// A piece of text produced by a splitter
///
/// A split remembers the byte ranges of the source text it was cut from, so
/// a document can map it back to a [`Span`](crate::text::document::Span).
/// Splits built from free text with [`PlainTextSplit::new`] are untracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PlainTextSplit {
    text: String,
    /// Ordered byte ranges into the source; `text` is their concatenation
    source_ranges: Option<Vec<Range<usize>>>,
}

impl PlainTextSplit {
    /// Create a split that does not track its source
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_ranges: None,
        }
    }

    /// Create a split covering the whole of `source`
    pub fn from_source(source: &str) -> Self {
        let mut ranges = Vec::new();
        push_range(&mut ranges, 0..source.len());
        Self {
            text: source.to_string(),
            source_ranges: Some(ranges),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn source_ranges(&self) -> Option<&[Range<usize>]> {
        self.source_ranges.as_deref()
    }

    pub fn is_tracked(&self) -> bool {
        self.source_ranges.is_some()
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.text.contains(pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Sub-split for the local byte range `local`, with source ranges mapped through
    pub(crate) fn slice(&self, local: Range<usize>) -> Self {
        let source_ranges = self.source_ranges.as_ref().map(|ranges| {
            let mut mapped = Vec::new();
            let mut offset = 0;
            for range in ranges {
                let segment_end = offset + range.len();
                let start = local.start.max(offset);
                let end = local.end.min(segment_end);
                if start < end {
                    push_range(
                        &mut mapped,
                        range.start + (start - offset)..range.start + (end - offset),
                    );
                }
                offset = segment_end;
                if offset >= local.end {
                    break;
                }
            }
            mapped
        });
        Self {
            text: self.text[local].to_string(),
            source_ranges,
        }
    }

    /// Copy with leading and trailing whitespace removed
    pub fn trimmed(&self) -> Self {
        let start = self.text.len() - self.text.trim_start().len();
        let end = self.text.trim_end().len();
        if start >= end {
            return self.slice(start..start);
        }
        self.slice(start..end)
    }

    fn append(&mut self, other: &PlainTextSplit) {
        if other.text.is_empty() {
            return;
        }
        self.text.push_str(&other.text);
        self.source_ranges = match (self.source_ranges.take(), &other.source_ranges) {
            (Some(mut ranges), Some(others)) => {
                let ordered = match (ranges.last(), others.first()) {
                    (Some(last), Some(first)) => last.end <= first.start,
                    _ => true,
                };
                if ordered {
                    for range in others {
                        push_range(&mut ranges, range.clone());
                    }
                    Some(ranges)
                } else {
                    tracing::debug!("Concatenated splits out of source order, dropping ranges");
                    None
                }
            }
            _ => None,
        };
    }
}

/// Append `range`, coalescing it with the previous one when they touch
fn push_range(ranges: &mut Vec<Range<usize>>, range: Range<usize>) {
    if range.is_empty() {
        return;
    }
    match ranges.last_mut() {
        Some(last) if last.end == range.start => last.end = range.end,
        _ => ranges.push(range),
    }
}

impl Add for PlainTextSplit {
    type Output = PlainTextSplit;

    fn add(mut self, rhs: PlainTextSplit) -> Self::Output {
        self.append(&rhs);
        self
    }
}

impl Add<&PlainTextSplit> for PlainTextSplit {
    type Output = PlainTextSplit;

    fn add(mut self, rhs: &PlainTextSplit) -> Self::Output {
        self.append(rhs);
        self
    }
}

impl AddAssign<&PlainTextSplit> for PlainTextSplit {
    fn add_assign(&mut self, rhs: &PlainTextSplit) {
        self.append(rhs);
    }
}

impl AddAssign for PlainTextSplit {
    fn add_assign(&mut self, rhs: PlainTextSplit) {
        self.append(&rhs);
    }
}

impl From<&str> for PlainTextSplit {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for PlainTextSplit {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl AsRef<str> for PlainTextSplit {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for PlainTextSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Statistical information for a split operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitStatistics {
    /// Total processing time
    pub total_processing_time: Duration,
    pub input_token_count: usize,

    /// Output chunk statistics
    pub total_chunks_created: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: f32,
    pub max_tokens_in_chunk: usize,
    pub min_tokens_in_chunk: usize,
}

impl SplitStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record token statistics for a chunk
    pub fn record_chunk(&mut self, token_count: usize) {
        if self.total_chunks_created == 0 || token_count < self.min_tokens_in_chunk {
            self.min_tokens_in_chunk = token_count;
        }
        if token_count > self.max_tokens_in_chunk {
            self.max_tokens_in_chunk = token_count;
        }
        self.total_chunks_created += 1;
        self.total_tokens += token_count;
    }

    /// Calculate derived metrics (call after all chunks are recorded)
    pub fn finish(&mut self, elapsed: Duration) {
        self.total_processing_time = elapsed;
        if self.total_chunks_created > 0 {
            self.avg_tokens_per_chunk = self.total_tokens as f32 / self.total_chunks_created as f32;
        }
    }

    /// Get summary as string for logging
    pub fn summary(&self) -> String {
        format!(
            "Split Stats: {} tokens -> {} chunks ({:.1} avg, {}..{} tokens/chunk) in {:.2}ms",
            self.input_token_count,
            self.total_chunks_created,
            self.avg_tokens_per_chunk,
            self.min_tokens_in_chunk,
            self.max_tokens_in_chunk,
            self.total_processing_time.as_secs_f64() * 1000.0,
        )
    }
}
