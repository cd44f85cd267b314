//! Error types for text splitting

use super::types::PlainTextSplit;
use crate::text::document::DocumentError;
use crate::text::tokenizer::TokenizationError;

/// Error types for text splitting operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TextSplitterError {
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    #[error("Split exceeds maximum size: expected <= {maximum}, got {actual}")]
    MaximumSplitSizeExceeded { maximum: usize, actual: usize },

    #[error("Top-level splits more granular than expected ({} splits)", .0.len())]
    TopLevelSplitsMoreGranularThanExpected(Vec<PlainTextSplit>),

    #[error("Non-blank input of {tokens} tokens produced no splits")]
    EmptySplit { tokens: usize },

    #[error("Tokenization failed: {0}")]
    Tokenization(#[from] TokenizationError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Result type for text splitting operations
pub type Result<T> = std::result::Result<T, TextSplitterError>;

impl TextSplitterError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a size validation error
    pub fn size_exceeded(maximum: usize, actual: usize) -> Self {
        Self::MaximumSplitSizeExceeded { maximum, actual }
    }

    /// Check if this error is recoverable
    ///
    /// Splitting never retries internally; only a tokenizer failure may
    /// succeed on a second attempt (e.g. after preheating).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Tokenization(_) => true,
            Self::InvalidConfiguration(_)
            | Self::MaximumSplitSizeExceeded { .. }
            | Self::TopLevelSplitsMoreGranularThanExpected(_)
            | Self::EmptySplit { .. }
            | Self::Document(_) => false,
        }
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "configuration",
            Self::MaximumSplitSizeExceeded { .. } => "maximum_split_size",
            Self::TopLevelSplitsMoreGranularThanExpected(_) => "granularity",
            Self::EmptySplit { .. } => "empty_split",
            Self::Tokenization(_) => "tokenization",
            Self::Document(_) => "document",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = TextSplitterError::configuration("overlap too large");
        assert!(matches!(error, TextSplitterError::InvalidConfiguration(_)));
        assert_eq!(error.to_string(), "Configuration error: overlap too large");

        let error = TextSplitterError::size_exceeded(100, 200);
        assert_eq!(
            error,
            TextSplitterError::MaximumSplitSizeExceeded {
                maximum: 100,
                actual: 200
            }
        );
        assert_eq!(
            error.to_string(),
            "Split exceeds maximum size: expected <= 100, got 200"
        );

        let error = TextSplitterError::TopLevelSplitsMoreGranularThanExpected(vec![
            PlainTextSplit::new("a"),
            PlainTextSplit::new("b"),
        ]);
        assert_eq!(
            error.to_string(),
            "Top-level splits more granular than expected (2 splits)"
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(TextSplitterError::configuration("test").category(), "configuration");
        assert_eq!(
            TextSplitterError::size_exceeded(10, 20).category(),
            "maximum_split_size"
        );
        assert_eq!(
            TextSplitterError::EmptySplit { tokens: 3 }.category(),
            "empty_split"
        );
    }

    #[test]
    fn test_error_recoverability() {
        assert!(!TextSplitterError::configuration("test").is_recoverable());
        assert!(!TextSplitterError::size_exceeded(10, 20).is_recoverable());
        assert!(
            TextSplitterError::from(TokenizationError::NotPreheated("bpe".into())).is_recoverable()
        );
    }

    #[test]
    fn test_error_from_conversions() {
        let error: TextSplitterError = TokenizationError::MalformedInput("bad".into()).into();
        assert!(matches!(error, TextSplitterError::Tokenization(_)));

        let error: TextSplitterError = DocumentError::EmptySpan.into();
        assert!(matches!(error, TextSplitterError::Document(_)));
        assert_eq!(error.category(), "document");
    }
}
