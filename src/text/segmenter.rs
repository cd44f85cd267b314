//! Sentence segmentation
//!
//! Segmenters report sentence boundaries as byte ranges so that chunks built
//! from sentences keep track of where they came from.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Splits text into sentences
pub trait SentenceSegmenter: Send + Sync {
    /// Ordered, non-overlapping byte ranges of the sentences in `text`
    fn sentences(&self, text: &str) -> Vec<Range<usize>>;
}

/// Rule-based segmenter cutting at sentence-final punctuation
#[derive(Debug, Clone)]
pub struct PunctuationSegmenter {
    max_sentence_length: usize,
    stop_chars: HashSet<char>,
    force: HashSet<char>,
    parentheses: HashMap<char, char>,
}

impl Default for PunctuationSegmenter {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

impl PunctuationSegmenter {
    /// Sentences longer than this many characters are cut
    pub const DEFAULT_MAX_LENGTH: usize = 512;

    // Quoting brackets. Stop chars inside them do not end a sentence.
    pub const PARENTHESES: [(char, char); 3] = [('「', '」'), ('『', '』'), ('【', '】')];

    // ASCII terminals only count before whitespace, so "3.14" or "a.b/c" stay whole
    pub const STOP_CHARS: [char; 8] = ['。', '．', '！', '？', '.', '!', '?', '\n'];

    pub fn new(
        max_sentence_length: Option<usize>,
        stop_chars: Option<HashSet<char>>,
        force: Option<HashSet<char>>,
        parentheses: Option<HashMap<char, char>>,
    ) -> Self {
        let max_sentence_length = max_sentence_length
            .unwrap_or(Self::DEFAULT_MAX_LENGTH)
            .max(1);
        let mut stop_chars = stop_chars.unwrap_or_else(|| Self::STOP_CHARS.into_iter().collect());
        let force = force.unwrap_or_default();
        // force chars cut everywhere, inside quotes too
        stop_chars.extend(force.iter().copied());
        let parentheses =
            parentheses.unwrap_or_else(|| Self::PARENTHESES.into_iter().collect());
        Self {
            max_sentence_length,
            stop_chars,
            force,
            parentheses,
        }
    }

    /// Sentences of `text` as string slices
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.sentences(text)
            .into_iter()
            .map(|range| &text[range])
            .collect()
    }
}

impl SentenceSegmenter for PunctuationSegmenter {
    fn sentences(&self, text: &str) -> Vec<Range<usize>> {
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut length = 0;
        let mut waiting_stack: Vec<char> = Vec::new();

        let mut chars = text.char_indices().peekable();
        while let Some((index, c)) = chars.next() {
            let end = index + c.len_utf8();
            length += 1;

            let cut = if let Some(close) = self.parentheses.get(&c) {
                waiting_stack.push(*close);
                false
            } else if let Some(expected) = waiting_stack.last() {
                if c == *expected {
                    waiting_stack.pop();
                    false
                } else {
                    self.force.contains(&c)
                }
            } else if self.stop_chars.contains(&c) {
                !c.is_ascii_punctuation()
                    || self.force.contains(&c)
                    || chars.peek().is_none_or(|(_, next)| next.is_whitespace())
            } else {
                false
            };

            if cut || length >= self.max_sentence_length {
                sentences.push(start..end);
                start = end;
                length = 0;
                waiting_stack.clear();
            }
        }
        if start < text.len() {
            sentences.push(start..text.len());
        }
        sentences
    }
}

/// Segmenter cutting after every match of a divider pattern
#[derive(Debug, Clone)]
pub struct RegexSegmenter {
    divider: Regex,
}

impl RegexSegmenter {
    pub fn new(divider: Regex) -> Self {
        Self { divider }
    }

    pub fn from_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::new)
    }
}

impl SentenceSegmenter for RegexSegmenter {
    fn sentences(&self, text: &str) -> Vec<Range<usize>> {
        let mut sentences = Vec::new();
        let mut previous = 0;
        for m in self.divider.find_iter(text) {
            if m.end() > previous {
                sentences.push(previous..m.end());
                previous = m.end();
            }
        }
        if previous < text.len() {
            sentences.push(previous..text.len());
        }
        sentences
    }
}
