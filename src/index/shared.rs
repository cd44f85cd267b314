//! Index shared between tasks behind an async read/write lock

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    AsyncVectorIndex, MutableAsyncVectorIndex, MutableVectorIndex, Result, SearchResult,
    VectorIndex, VectorIndexQuery,
};

/// Index that can be cloned into tasks and queried in async context.
///
/// Queries run concurrently; inserts and removals wait for readers to finish.
pub struct SharedVectorIndex<I> {
    inner: Arc<RwLock<I>>,
}

impl<I> Clone for SharedVectorIndex<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Default> Default for SharedVectorIndex<I> {
    fn default() -> Self {
        Self::new(I::default())
    }
}

impl<I> From<I> for SharedVectorIndex<I> {
    fn from(index: I) -> Self {
        Self::new(index)
    }
}

impl<I> SharedVectorIndex<I> {
    pub fn new(index: I) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// Lock for reading, e.g. to reach methods specific to the wrapped index
    pub async fn read(&self) -> RwLockReadGuard<'_, I> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, I> {
        self.inner.write().await
    }
}

impl<I: VectorIndex> SharedVectorIndex<I> {
    pub async fn query(&self, query: &VectorIndexQuery) -> Result<Vec<SearchResult<I::Key>>> {
        let index = self.inner.read().await;
        index.query(query)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl<I: MutableVectorIndex> SharedVectorIndex<I> {
    pub async fn insert<P>(&self, pairs: P) -> Result<()>
    where
        P: IntoIterator<Item = (I::Key, Vec<f64>)>,
    {
        let mut index = self.inner.write().await;
        index.insert(pairs)
    }

    pub async fn remove(&self, keys: &[I::Key]) -> usize {
        let mut index = self.inner.write().await;
        index.remove(keys)
    }

    pub async fn remove_all(&self) {
        self.inner.write().await.remove_all();
    }
}

impl<I> AsyncVectorIndex for SharedVectorIndex<I>
where
    I: VectorIndex,
    I::Key: Send,
{
    type Key = I::Key;

    fn query_async<'a>(
        &'a self,
        query: &'a VectorIndexQuery,
    ) -> BoxFuture<'a, Result<Vec<SearchResult<I::Key>>>> {
        self.query(query).boxed()
    }

    fn len_async(&self) -> BoxFuture<'_, usize> {
        self.len().boxed()
    }
}

impl<I> MutableAsyncVectorIndex for SharedVectorIndex<I>
where
    I: MutableVectorIndex,
    I::Key: Send + Sync,
{
    fn insert_async(&mut self, pairs: Vec<(I::Key, Vec<f64>)>) -> BoxFuture<'_, Result<()>> {
        async move { self.inner.write().await.insert(pairs) }.boxed()
    }

    fn remove_async<'a>(&'a mut self, keys: &'a [I::Key]) -> BoxFuture<'a, usize> {
        async move { self.inner.write().await.remove(keys) }.boxed()
    }

    fn remove_all_async(&mut self) -> BoxFuture<'_, ()> {
        async move { self.inner.write().await.remove_all() }.boxed()
    }
}
