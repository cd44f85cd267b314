//! Queries accepted by vector indices and their results

use serde::{Deserialize, Serialize};

/// A similarity query against a vector index
///
/// Indices match on the variant and reject the shapes they cannot answer
/// with [`VectorIndexError::UnsupportedQuery`](super::VectorIndexError::UnsupportedQuery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum VectorIndexQuery {
    /// The `k` highest-scoring entries
    TopK { vector: Vec<f64>, k: usize },
    /// Every entry scoring at least `minimum_score`
    ScoreThreshold { vector: Vec<f64>, minimum_score: f64 },
}

impl VectorIndexQuery {
    pub fn top_matches(vector: Vec<f64>, maximum_number_of_results: usize) -> Self {
        Self::TopK {
            vector,
            k: maximum_number_of_results,
        }
    }

    pub fn score_threshold(vector: Vec<f64>, minimum_score: f64) -> Self {
        Self::ScoreThreshold {
            vector,
            minimum_score,
        }
    }

    pub fn vector(&self) -> &[f64] {
        match self {
            Self::TopK { vector, .. } | Self::ScoreThreshold { vector, .. } => vector,
        }
    }

    /// Name of the query shape, for errors and logs
    pub fn shape(&self) -> &'static str {
        match self {
            Self::TopK { .. } => "top_k",
            Self::ScoreThreshold { .. } => "score_threshold",
        }
    }
}

/// A matched key with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<K> {
    pub key: K,
    pub score: f64,
}

impl<K> SearchResult<K> {
    pub fn new(key: K, score: f64) -> Self {
        Self { key, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_constructors() {
        let query = VectorIndexQuery::top_matches(vec![1.0, 0.0], 3);
        assert_eq!(
            query,
            VectorIndexQuery::TopK {
                vector: vec![1.0, 0.0],
                k: 3
            }
        );
        assert_eq!(query.vector(), &[1.0, 0.0]);
        assert_eq!(query.shape(), "top_k");

        let query = VectorIndexQuery::score_threshold(vec![0.5], 0.8);
        assert_eq!(query.shape(), "score_threshold");
        assert_eq!(query.vector(), &[0.5]);
    }

    #[test]
    fn test_query_json() {
        let query: VectorIndexQuery =
            serde_json::from_str(r#"{"type": "top_k", "vector": [0.1, 0.2], "k": 5}"#).unwrap();
        assert_eq!(query, VectorIndexQuery::top_matches(vec![0.1, 0.2], 5));

        let json = serde_json::to_value(VectorIndexQuery::score_threshold(vec![1.0], 0.5)).unwrap();
        assert_eq!(json["type"], "score_threshold");
        assert_eq!(json["minimum_score"], 0.5);
    }
}
