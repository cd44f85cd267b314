//! Configuration for text splitting

use super::error::{Result, TextSplitterError};
use crate::text::tokenizer::{CharacterTokenizer, TextTokenizer, TokenizerRegistry};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Immutable configuration shared by every splitter
#[derive(Debug, Clone)]
pub struct TextSplitConfiguration {
    /// Maximum tokens per split (`None` = unbounded)
    maximum_split_size: Option<usize>,
    /// Maximum tokens carried over between adjacent merged splits
    maximum_split_overlap: usize,
    tokenizer: Arc<dyn TextTokenizer>,
}

impl Default for TextSplitConfiguration {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl TextSplitConfiguration {
    pub fn new(
        maximum_split_size: Option<usize>,
        maximum_split_overlap: usize,
        tokenizer: Arc<dyn TextTokenizer>,
    ) -> Result<Self> {
        if let Some(max) = maximum_split_size {
            if max == 0 {
                return Err(TextSplitterError::configuration(
                    "maximum_split_size must be greater than 0",
                ));
            }
            if maximum_split_overlap >= max {
                return Err(TextSplitterError::configuration(format!(
                    "maximum_split_overlap ({maximum_split_overlap}) must be less than maximum_split_size ({max})"
                )));
            }
        }
        Ok(Self {
            maximum_split_size,
            maximum_split_overlap,
            tokenizer,
        })
    }

    /// No size budget, character tokenizer
    pub fn unbounded() -> Self {
        Self {
            maximum_split_size: None,
            maximum_split_overlap: 0,
            tokenizer: Arc::new(CharacterTokenizer),
        }
    }

    /// Budget of `maximum_split_size` characters without overlap
    pub fn with_maximum_split_size(maximum_split_size: usize) -> Result<Self> {
        Self::new(Some(maximum_split_size), 0, Arc::new(CharacterTokenizer))
    }

    pub fn maximum_split_size(&self) -> Option<usize> {
        self.maximum_split_size
    }

    pub fn maximum_split_overlap(&self) -> usize {
        self.maximum_split_overlap
    }

    pub fn tokenizer(&self) -> &Arc<dyn TextTokenizer> {
        &self.tokenizer
    }

    /// Whether `token_count` is over budget
    pub fn exceeds(&self, token_count: usize) -> bool {
        self.maximum_split_size
            .is_some_and(|max| token_count > max)
    }
}

/// Which side of a split a separator stays attached to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorAffinity {
    /// Separator starts the following piece
    Prefix,
    /// Separator ends the preceding piece
    #[default]
    Suffix,
}

/// Boundary string used by the recursive splitters
///
/// The word separator `" "` matches any run of whitespace, so tabs and
/// non-breaking spaces separate words too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Separator {
    pub value: String,
    #[serde(default)]
    pub affinity: SeparatorAffinity,
}

impl Separator {
    pub const WORD: &'static str = " ";

    pub fn new(value: impl Into<String>, affinity: SeparatorAffinity) -> Self {
        Self {
            value: value.into(),
            affinity,
        }
    }

    pub fn suffix(value: impl Into<String>) -> Self {
        Self::new(value, SeparatorAffinity::Suffix)
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self::new(value, SeparatorAffinity::Prefix)
    }

    /// Paragraph, line, word, then grapheme boundaries
    pub fn defaults() -> Vec<Separator> {
        ["\n\n", "\n", Self::WORD, ""]
            .into_iter()
            .map(Separator::suffix)
            .collect()
    }

    /// The empty separator splits into grapheme clusters
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_word(&self) -> bool {
        self.value == Self::WORD
    }

    /// Whether splitting `text` on this separator is possible
    pub fn applies_to(&self, text: &str) -> bool {
        if self.is_word() {
            return text.contains(char::is_whitespace);
        }
        self.is_empty() || text.contains(self.value.as_str())
    }

    /// Byte ranges of the occurrences of the separator in `text`.
    ///
    /// Always empty for the empty separator.
    pub fn find_in(&self, text: &str) -> Vec<Range<usize>> {
        if self.is_empty() {
            return Vec::new();
        }
        if !self.is_word() {
            return text
                .match_indices(self.value.as_str())
                .map(|(index, matched)| index..index + matched.len())
                .collect();
        }

        let mut runs: Vec<Range<usize>> = Vec::new();
        for (index, c) in text.char_indices().filter(|(_, c)| c.is_whitespace()) {
            match runs.last_mut() {
                Some(run) if run.end == index => run.end = index + c.len_utf8(),
                _ => runs.push(index..index + c.len_utf8()),
            }
        }
        runs
    }

    /// The whitespace part of the separator that trimming strips from a piece.
    ///
    /// Merged pieces are joined with it.
    pub fn joiner(&self) -> &str {
        self.joiner_of(&self.value)
    }

    /// The joiner part of one matched occurrence
    pub fn joiner_of<'t>(&self, matched: &'t str) -> &'t str {
        match self.affinity {
            SeparatorAffinity::Suffix => &matched[matched.trim_end().len()..],
            SeparatorAffinity::Prefix => &matched[..matched.len() - matched.trim_start().len()],
        }
    }
}

fn default_tokenizer() -> String {
    CharacterTokenizer::IDENTIFIER.to_string()
}

/// Serializable splitter settings
///
/// Loaded from `SPLIT_*` environment variables or JSON, then resolved into a
/// [`TextSplitConfiguration`] against a [`TokenizerRegistry`]. Separators can
/// only be customized from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSplitSettings {
    #[serde(default)]
    pub maximum_split_size: Option<usize>,
    #[serde(default)]
    pub maximum_split_overlap: usize,
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separators: Option<Vec<Separator>>,
}

impl Default for TextSplitSettings {
    fn default() -> Self {
        Self {
            maximum_split_size: None,
            maximum_split_overlap: 0,
            tokenizer: default_tokenizer(),
            separators: None,
        }
    }
}

impl TextSplitSettings {
    pub const ENV_PREFIX: &'static str = "SPLIT_";

    pub fn from_env() -> Result<Self> {
        envy::prefixed(Self::ENV_PREFIX)
            .from_env::<Self>()
            .map_err(|e| {
                TextSplitterError::configuration(format!("cannot read split settings from env: {e}"))
            })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            TextSplitterError::configuration(format!("cannot parse split settings: {e}"))
        })
    }

    pub fn separators_or_default(&self) -> Vec<Separator> {
        self.separators.clone().unwrap_or_else(Separator::defaults)
    }

    pub fn into_configuration(&self, registry: &TokenizerRegistry) -> Result<TextSplitConfiguration> {
        let tokenizer = registry.resolve(&self.tokenizer)?;
        TextSplitConfiguration::new(
            self.maximum_split_size,
            self.maximum_split_overlap,
            tokenizer,
        )
    }
}
