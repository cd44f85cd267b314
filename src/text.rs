//! Text processing: tokenization, sentence segmentation, splitting and the
//! document span model.

pub mod chunking;
pub mod document;
pub mod segmenter;
pub mod tokenizer;

pub use document::{
    ConsecutiveRanges, DocumentChunk, DocumentError, PlainTextDocument, SequentialSelection, Span,
    TextRange,
};
pub use segmenter::{PunctuationSegmenter, RegexSegmenter, SentenceSegmenter};
pub use tokenizer::{
    CharacterTokenizer, TextTokenizer, Token, TokenizationError, TokenizerRegistry,
    WhitespaceTokenizer,
};
