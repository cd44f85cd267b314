//! Error types for vector indices

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum VectorIndexError {
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector must not be empty")]
    EmptyVector,

    #[error("Vector contains non-finite components")]
    NonFiniteVector,
}

/// Result type for vector index operations
pub type Result<T> = std::result::Result<T, VectorIndexError>;

impl VectorIndexError {
    pub fn unsupported_query<S: Into<String>>(shape: S) -> Self {
        Self::UnsupportedQuery(shape.into())
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedQuery(_) => "unsupported_query",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::EmptyVector => "empty_vector",
            Self::NonFiniteVector => "non_finite_vector",
        }
    }
}
