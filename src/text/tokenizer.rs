//! Token counting for size budgets
//!
//! Every sizing decision of the splitters goes through a [`TextTokenizer`].
//! Tokenizers are resolved by a stable identifier through
//! [`TokenizerRegistry`] instead of being serialized with a configuration.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Error types for tokenization
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizationError {
    #[error("Malformed tokenizer input: {0}")]
    MalformedInput(String),

    #[error("Unsupported token: {0}")]
    UnsupportedToken(String),

    #[error("Tokenizer used before preheat: {0}")]
    NotPreheated(String),

    #[error("Unknown tokenizer: {0}")]
    UnknownTokenizer(String),
}

pub type Result<T> = std::result::Result<T, TokenizationError>;

/// Atomic unit produced by a tokenizer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Textual token (a character or a word)
    Text(String),
    /// Vocabulary id
    Id(u32),
}

impl Token {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(text) => Some(text),
            Token::Id(_) => None,
        }
    }
}

/// Synchronous text tokenizer
///
/// Implementations must be deterministic: the same text always yields the
/// same token count. A tokenizer that needs to load a vocabulary does it in
/// [`TextTokenizer::preheat`], which callers await once before the first
/// `encode` / `token_count`.
pub trait TextTokenizer: Send + Sync + Debug {
    /// Stable identifier used by [`TokenizerRegistry`]
    fn identifier(&self) -> &str;

    fn encode(&self, text: &str) -> Result<Vec<Token>>;

    fn decode(&self, tokens: &[Token]) -> Result<String>;

    /// Number of tokens `encode` would produce (override only as a fast path)
    fn token_count(&self, text: &str) -> Result<usize> {
        self.encode(text).map(|tokens| tokens.len())
    }

    /// Whether `decode(encode(x)) == x` holds for every input
    fn is_lossless(&self) -> bool {
        false
    }

    /// One-time asynchronous initialisation. Must be idempotent.
    fn preheat(&self) -> BoxFuture<'_, Result<()>> {
        async { Ok(()) }.boxed()
    }
}

/// One token per extended grapheme cluster. Lossless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CharacterTokenizer;

impl CharacterTokenizer {
    pub const IDENTIFIER: &'static str = "character";
}

impl TextTokenizer for CharacterTokenizer {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        Ok(text
            .graphemes(true)
            .map(|g| Token::Text(g.to_string()))
            .collect())
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        tokens
            .iter()
            .map(|token| {
                token
                    .as_text()
                    .ok_or_else(|| TokenizationError::UnsupportedToken(format!("{token:?}")))
            })
            .collect()
    }

    fn token_count(&self, text: &str) -> Result<usize> {
        Ok(text.graphemes(true).count())
    }

    fn is_lossless(&self) -> bool {
        true
    }
}

/// One token per whitespace-delimited word.
///
/// Lossy: decoding joins words with a single space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    pub const IDENTIFIER: &'static str = "whitespace";
}

impl TextTokenizer for WhitespaceTokenizer {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        Ok(text
            .split_whitespace()
            .map(|word| Token::Text(word.to_string()))
            .collect())
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        let words = tokens
            .iter()
            .map(|token| {
                token
                    .as_text()
                    .ok_or_else(|| TokenizationError::UnsupportedToken(format!("{token:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(words.join(" "))
    }

    fn token_count(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Registry of tokenizers keyed by their stable identifier
#[derive(Debug, Clone)]
pub struct TokenizerRegistry {
    tokenizers: HashMap<String, Arc<dyn TextTokenizer>>,
}

impl Default for TokenizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenizerRegistry {
    /// Registry pre-loaded with the built-in tokenizers
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(CharacterTokenizer));
        registry.register(Arc::new(WhitespaceTokenizer));
        registry
    }

    pub fn empty() -> Self {
        Self {
            tokenizers: HashMap::new(),
        }
    }

    /// Register a tokenizer, replacing any previous one with the same identifier
    pub fn register(&mut self, tokenizer: Arc<dyn TextTokenizer>) {
        let id = tokenizer.identifier().to_string();
        if self.tokenizers.insert(id.clone(), tokenizer).is_some() {
            tracing::debug!("replaced registered tokenizer: {}", id);
        }
    }

    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn TextTokenizer>> {
        self.tokenizers
            .get(identifier)
            .cloned()
            .ok_or_else(|| TokenizationError::UnknownTokenizer(identifier.to_string()))
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tokenizers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Memo of token counts for the duration of a single split operation
#[derive(Debug)]
pub struct TokenCountCache<'a> {
    tokenizer: &'a dyn TextTokenizer,
    counts: HashMap<String, usize>,
    /// Maximum cache size to prevent memory bloat
    max_cache_size: usize,
}

impl<'a> TokenCountCache<'a> {
    pub const DEFAULT_MAX_SIZE: usize = 4096;

    pub fn new(tokenizer: &'a dyn TextTokenizer) -> Self {
        Self::with_capacity(tokenizer, Self::DEFAULT_MAX_SIZE)
    }

    pub fn with_capacity(tokenizer: &'a dyn TextTokenizer, max_cache_size: usize) -> Self {
        Self {
            tokenizer,
            counts: HashMap::new(),
            max_cache_size: max_cache_size.max(1),
        }
    }

    pub fn tokenizer(&self) -> &'a dyn TextTokenizer {
        self.tokenizer
    }

    pub fn count(&mut self, text: &str) -> Result<usize> {
        if let Some(count) = self.counts.get(text) {
            return Ok(*count);
        }
        let count = self.tokenizer.token_count(text)?;

        if self.counts.len() >= self.max_cache_size {
            // Simple eviction: clear half the cache
            let keys_to_remove: Vec<_> = self
                .counts
                .keys()
                .take(self.max_cache_size / 2 + 1)
                .cloned()
                .collect();
            for key in keys_to_remove {
                self.counts.remove(&key);
            }
        }
        self.counts.insert(text.to_string(), count);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// One token per UTF-8 byte, so a single grapheme can cost several tokens
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ByteTokenizer;

#[cfg(test)]
impl TextTokenizer for ByteTokenizer {
    fn identifier(&self) -> &str {
        "byte"
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        Ok(text.bytes().map(|byte| Token::Id(byte as u32)).collect())
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        let bytes = tokens
            .iter()
            .map(|token| match token {
                Token::Id(id) => u8::try_from(*id)
                    .map_err(|_| TokenizationError::UnsupportedToken(format!("{token:?}"))),
                Token::Text(_) => Err(TokenizationError::UnsupportedToken(format!("{token:?}"))),
            })
            .collect::<Result<Vec<u8>>>()?;
        String::from_utf8(bytes).map_err(|e| TokenizationError::UnsupportedToken(e.to_string()))
    }

    fn token_count(&self, text: &str) -> Result<usize> {
        Ok(text.len())
    }
}
