//! Exact, in-memory vector index
//!
//! Every query scores all stored vectors (brute force), which is simple and
//! correct for the corpus sizes a single document bundle produces.

use super::error::{Result, VectorIndexError};
use super::query::{SearchResult, VectorIndexQuery};
use super::similarity::cosine_similarity;
use super::{MutableVectorIndex, VectorIndex};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    /// Insertion order, kept when the vector is replaced
    sequence: u64,
    vector: Vec<f64>,
}

/// Brute-force cosine similarity index keyed by `K`
///
/// The vector dimension is fixed by the first insert and forgotten again by
/// [`MutableVectorIndex::remove_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    into = "IndexSnapshot<K>",
    try_from = "IndexSnapshot<K>",
    bound(
        serialize = "K: Serialize + Clone + Eq + Hash",
        deserialize = "K: Deserialize<'de> + Eq + Hash"
    )
)]
pub struct NaiveVectorIndex<K> {
    entries: HashMap<K, Entry>,
    dimension: Option<usize>,
    next_sequence: u64,
}

/// Serialized form of [`NaiveVectorIndex`]: entries in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot<K> {
    pub dimension: Option<usize>,
    pub entries: Vec<(K, Vec<f64>)>,
}

impl<K> Default for NaiveVectorIndex<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            dimension: None,
            next_sequence: 0,
        }
    }
}

impl<K> NaiveVectorIndex<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension of the stored vectors, `None` while empty
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn get(&self, key: &K) -> Option<&[f64]> {
        self.entries.get(key).map(|entry| entry.vector.as_slice())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<&K> {
        self.entries
            .iter()
            .sorted_by_key(|(_, entry)| entry.sequence)
            .map(|(key, _)| key)
            .collect()
    }

    /// Check `vector` against `expected` (the index dimension or the first
    /// vector of the batch)
    fn validate(vector: &[f64], expected: Option<usize>) -> Result<()> {
        if vector.is_empty() {
            return Err(VectorIndexError::EmptyVector);
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(VectorIndexError::NonFiniteVector);
        }
        match expected {
            Some(expected) if expected != vector.len() => Err(VectorIndexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Entries ranked by descending score, ties in insertion order
    fn ranked(&self, vector: &[f64]) -> Result<Vec<(&K, f64)>> {
        let Some(dimension) = self.dimension else {
            Self::validate(vector, None)?;
            return Ok(Vec::new());
        };
        Self::validate(vector, Some(dimension))?;

        Ok(self
            .entries
            .iter()
            .map(|(key, entry)| (key, entry.sequence, cosine_similarity(vector, &entry.vector)))
            .sorted_by(|a, b| b.2.total_cmp(&a.2).then(a.1.cmp(&b.1)))
            .map(|(key, _, score)| (key, score))
            .collect())
    }
}

impl<K> VectorIndex for NaiveVectorIndex<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    type Key = K;

    fn query(&self, query: &VectorIndexQuery) -> Result<Vec<SearchResult<K>>> {
        let ranked = self.ranked(query.vector())?;
        let results = match query {
            VectorIndexQuery::TopK { k, .. } => ranked
                .into_iter()
                .take(*k)
                .map(|(key, score)| SearchResult::new(key.clone(), score))
                .collect(),
            VectorIndexQuery::ScoreThreshold { minimum_score, .. } => ranked
                .into_iter()
                .take_while(|(_, score)| score >= minimum_score)
                .map(|(key, score)| SearchResult::new(key.clone(), score))
                .collect(),
        };
        Ok(results)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K> MutableVectorIndex for NaiveVectorIndex<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn insert<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Vec<f64>)>,
    {
        let pairs: Vec<(K, Vec<f64>)> = pairs.into_iter().collect();
        let mut dimension = self.dimension;
        for (_, vector) in &pairs {
            Self::validate(vector, dimension)?;
            dimension = Some(vector.len());
        }

        self.dimension = dimension;
        let count = pairs.len();
        for (key, vector) in pairs {
            match self.entries.get_mut(&key) {
                Some(entry) => entry.vector = vector,
                None => {
                    let sequence = self.next_sequence;
                    self.next_sequence += 1;
                    self.entries.insert(key, Entry { sequence, vector });
                }
            }
        }
        tracing::debug!("Inserted {} vectors, index size {}", count, self.entries.len());
        Ok(())
    }

    fn remove(&mut self, keys: &[K]) -> usize {
        let removed = keys
            .iter()
            .filter(|key| self.entries.remove(*key).is_some())
            .count();
        if self.entries.is_empty() {
            self.dimension = None;
        }
        removed
    }

    fn remove_all(&mut self) {
        self.entries.clear();
        self.dimension = None;
        self.next_sequence = 0;
    }
}

impl<K> From<NaiveVectorIndex<K>> for IndexSnapshot<K>
where
    K: Eq + Hash + Clone,
{
    fn from(index: NaiveVectorIndex<K>) -> Self {
        let mut entries: Vec<(K, Entry)> = index.entries.into_iter().collect();
        entries.sort_by_key(|(_, entry)| entry.sequence);
        Self {
            dimension: index.dimension,
            entries: entries
                .into_iter()
                .map(|(key, entry)| (key, entry.vector))
                .collect(),
        }
    }
}

impl<K> TryFrom<IndexSnapshot<K>> for NaiveVectorIndex<K>
where
    K: Eq + Hash,
{
    type Error = VectorIndexError;

    fn try_from(snapshot: IndexSnapshot<K>) -> Result<Self> {
        let mut index = Self::new();
        for (key, vector) in snapshot.entries {
            Self::validate(&vector, index.dimension.or(snapshot.dimension))?;
            index.dimension = Some(vector.len());
            match index.entries.get_mut(&key) {
                Some(entry) => entry.vector = vector,
                None => {
                    let sequence = index.next_sequence;
                    index.next_sequence += 1;
                    index.entries.insert(key, Entry { sequence, vector });
                }
            }
        }
        Ok(index)
    }
}
