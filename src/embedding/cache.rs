use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::provider::Embedder;
use crate::error::Result;

/// Wraps an [`Embedder`] with a bounded, least-recently-used memo keyed by
/// exact text.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Memoized embed, for the save path where identical search text recurs.
    /// The lock is never held across the remote call.
    pub async fn embed_cached(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.cache.lock().get(text).cloned() {
            debug!(dims = hit.len(), "Embedding cache hit");
            return Ok(hit);
        }

        let vector = self.inner.embed(text).await?;
        self.cache.lock().put(text.to_string(), vector.clone());
        Ok(vector)
    }

    /// Plain embed, for one-off search queries where memoization accrues no
    /// benefit.
    pub async fn embed_uncached(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn counting() -> (Arc<CountingEmbedder>, CachedEmbedder) {
        let backend = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(Arc::clone(&backend) as Arc<dyn Embedder>, 2);
        (backend, cached)
    }

    #[tokio::test]
    async fn test_cached_embed_hits_backend_once() {
        let (backend, cached) = counting();

        let first = cached.embed_cached("same text").await.unwrap();
        let second = cached.embed_cached("same text").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_uncached_embed_always_calls_backend() {
        let (backend, cached) = counting();

        cached.embed_uncached("query").await.unwrap();
        cached.embed_uncached("query").await.unwrap();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lru_evicts_oldest_entry() {
        let (backend, cached) = counting();

        cached.embed_cached("a").await.unwrap();
        cached.embed_cached("bb").await.unwrap();
        cached.embed_cached("ccc").await.unwrap(); // evicts "a"
        cached.embed_cached("a").await.unwrap(); // re-fetched

        assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
    }
}
