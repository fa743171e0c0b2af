use crate::remote::RemoteError;
use moka::future::Cache;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

pub type FetchResult<V> = Result<V, Arc<RemoteError>>;

/// Insert-only memo of remote resources of one class, keyed by identity.
///
/// Concurrent misses on the same key share a single fetch and all observe its
/// result. A failed fetch is not stored, so the next access retries. Distinct
/// keys never wait on each other.
pub struct ResourceDirectory<K, V> {
    class: &'static str,
    entries: Cache<K, V>,
}

impl<K, V> ResourceDirectory<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Unbounded and without expiry: entries live as long as the directory.
    pub fn new(class: &'static str) -> Self {
        Self { class, entries: Cache::builder().name(class).build() }
    }

    pub async fn get_or_fetch<F>(&self, key: K, fetch: F) -> FetchResult<V>
    where
        F: Future<Output = Result<V, RemoteError>>,
    {
        let class = self.class;
        let debug_key = key.clone();
        self.entries
            .try_get_with(key, async move {
                tracing::debug!(class, key = ?debug_key, "cache miss, fetching");
                let result = fetch.await;
                if let Err(ref err) = result {
                    tracing::debug!(class, key = ?debug_key, error = %err, "fetch failed");
                }
                result
            })
            .await
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).await
    }

    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn class(&self) -> &'static str {
        self.class
    }
}
