//! Vector indices for exact nearest-neighbour lookup of chunk embeddings
//!
//! Synchronous indices implement [`VectorIndex`] / [`MutableVectorIndex`].
//! Every synchronous index is also usable from async code through the
//! blanket [`AsyncVectorIndex`] / [`MutableAsyncVectorIndex`] impls;
//! [`SharedVectorIndex`] implements the async traits with a lock so tasks
//! can share one index.

pub mod error;
pub mod naive;
pub mod query;
pub mod shared;
pub mod similarity;

pub use error::{Result, VectorIndexError};
pub use naive::NaiveVectorIndex;
pub use query::{SearchResult, VectorIndexQuery};
pub use shared::SharedVectorIndex;
pub use similarity::cosine_similarity;

use futures::FutureExt;
use futures::future::{self, BoxFuture};

/// Read access to a vector index
pub trait VectorIndex: Send + Sync {
    type Key;

    /// Answer `query`, best match first
    fn query(&self, query: &VectorIndexQuery) -> Result<Vec<SearchResult<Self::Key>>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write access to a vector index
pub trait MutableVectorIndex: VectorIndex {
    /// Insert or replace vectors for keys. Either every pair is stored or none is.
    fn insert<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (Self::Key, Vec<f64>)>;

    /// Remove keys, ignoring the ones that are not present. Returns the number removed.
    fn remove(&mut self, keys: &[Self::Key]) -> usize;

    fn remove_all(&mut self);

    fn insert_one(&mut self, key: Self::Key, vector: Vec<f64>) -> Result<()> {
        self.insert([(key, vector)])
    }

    fn remove_one(&mut self, key: &Self::Key) -> bool {
        self.remove(std::slice::from_ref(key)) > 0
    }
}

/// Read access that may suspend
pub trait AsyncVectorIndex: Send + Sync {
    type Key: Send;

    fn query_async<'a>(
        &'a self,
        query: &'a VectorIndexQuery,
    ) -> BoxFuture<'a, Result<Vec<SearchResult<Self::Key>>>>;

    fn len_async(&self) -> BoxFuture<'_, usize>;
}

/// Write access that may suspend
pub trait MutableAsyncVectorIndex: AsyncVectorIndex {
    fn insert_async(&mut self, pairs: Vec<(Self::Key, Vec<f64>)>) -> BoxFuture<'_, Result<()>>;

    fn remove_async<'a>(&'a mut self, keys: &'a [Self::Key]) -> BoxFuture<'a, usize>;

    fn remove_all_async(&mut self) -> BoxFuture<'_, ()>;
}

impl<I> AsyncVectorIndex for I
where
    I: VectorIndex,
    I::Key: Send,
{
    type Key = I::Key;

    fn query_async<'a>(
        &'a self,
        query: &'a VectorIndexQuery,
    ) -> BoxFuture<'a, Result<Vec<SearchResult<I::Key>>>> {
        future::ready(self.query(query)).boxed()
    }

    fn len_async(&self) -> BoxFuture<'_, usize> {
        future::ready(self.len()).boxed()
    }
}

impl<I> MutableAsyncVectorIndex for I
where
    I: MutableVectorIndex,
    I::Key: Send,
{
    fn insert_async(&mut self, pairs: Vec<(I::Key, Vec<f64>)>) -> BoxFuture<'_, Result<()>> {
        future::ready(self.insert(pairs)).boxed()
    }

    fn remove_async<'a>(&'a mut self, keys: &'a [I::Key]) -> BoxFuture<'a, usize> {
        future::ready(self.remove(keys)).boxed()
    }

    fn remove_all_async(&mut self) -> BoxFuture<'_, ()> {
        self.remove_all();
        future::ready(()).boxed()
    }
}
