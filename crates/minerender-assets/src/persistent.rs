//! Durable cache tier.
//!
//! A [`PersistentCache`] is a namespaced view onto a [`Store`] that serializes
//! values as JSON and guarantees at most one in-flight load per key. Handles
//! are obtained from a [`CacheDirectory`], which opens each namespace once and
//! hands out clones of the same handle afterwards.

use std::{
    collections::HashMap,
    future::Future,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::store::{FilesystemStore, MemoryStore, Store};

type KeyLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Namespaced, durable, single-flight cache.
#[derive(Clone)]
pub struct PersistentCache {
    namespace: Arc<str>,
    store: Arc<dyn Store>,
    loading: Arc<KeyLocks>,
}

impl std::fmt::Debug for PersistentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl PersistentCache {
    /// Wrap a store that already covers `namespace`.
    #[must_use]
    pub fn with_store(namespace: &str, store: Arc<dyn Store>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
            loading: Arc::default(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Return the stored value for `key`, or run `loader`, persist its result
    /// and return it.
    ///
    /// Store failures propagate and are not retried. A loader error is
    /// returned without writing anything.
    pub async fn get_or_load<V, F, Fut>(&self, key: &str, loader: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.single_flight(key, self.load_locked(key, loader, |_| true))
            .await
    }

    /// Like [`get_or_load`](Self::get_or_load), but only `Some` values are
    /// persisted.
    ///
    /// Absence is answered by the loader every time, so an asset that was
    /// unreachable once is looked up again after a restart.
    pub async fn get_or_load_present<V, F, Fut>(&self, key: &str, loader: F) -> Result<Option<V>>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<V>>>,
    {
        self.single_flight(key, self.load_locked(key, loader, Option::is_some))
            .await
    }

    /// Run `load` while holding the per-key lock.
    ///
    /// A second caller waits for the first and then finds the persisted
    /// value instead of loading again.
    async fn single_flight<T>(&self, key: &str, load: impl Future<Output = T>) -> T {
        let key_lock = Arc::clone(self.locks().entry(key.to_owned()).or_default());
        let result = {
            let _guard = key_lock.lock().await;
            load.await
        };

        let mut locks = self.locks();
        // Ours plus the map's reference: nobody else is waiting.
        if Arc::strong_count(&key_lock) == 2 {
            locks.remove(key);
        }
        result
    }

    async fn load_locked<V, F, Fut>(&self, key: &str, loader: F, keep: fn(&V) -> bool) -> Result<V>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(data) = self.store.get(key).await? {
            match serde_json::from_slice(&data) {
                Ok(value) if keep(&value) => {
                    tracing::debug!(namespace = %self.namespace, key, "persistent hit");
                    return Ok(value);
                }
                Ok(_) => {
                    tracing::debug!(namespace = %self.namespace, key, "ignoring stored absence");
                }
                Err(e) => {
                    // Stale format from an older build: treat as a miss.
                    tracing::warn!(
                        namespace = %self.namespace,
                        key,
                        "discarding unreadable entry: {e}"
                    );
                }
            }
        }

        tracing::debug!(namespace = %self.namespace, key, "persistent miss");
        let value = loader(key.to_owned()).await?;
        if keep(&value) {
            self.store.put(key, serde_json::to_vec(&value)?).await?;
        }
        Ok(value)
    }

    /// Remove every entry in this namespace.
    pub async fn clear(&self) -> Result<()> {
        tracing::info!(namespace = %self.namespace, "clearing persistent cache");
        self.store.clear().await
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.loading.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Where a [`CacheDirectory`] keeps its namespaces.
#[derive(Debug, Clone)]
pub enum StoreRoot {
    /// One subdirectory per namespace.
    Filesystem(PathBuf),
    /// Process memory only.
    Memory,
}

/// Process-scoped registry of persistent caches.
///
/// Each namespace is opened lazily on first request and the same handle is
/// returned afterwards, so single-flight guarantees hold across every user of
/// the namespace. Tests get isolation by creating their own directory.
#[derive(Debug)]
pub struct CacheDirectory {
    root: StoreRoot,
    opened: Mutex<HashMap<String, PersistentCache>>,
}

impl CacheDirectory {
    #[must_use]
    pub fn new(root: StoreRoot) -> Self {
        Self {
            root,
            opened: Mutex::new(HashMap::new()),
        }
    }

    /// Registry backed by `path` on disk.
    #[must_use]
    pub fn filesystem(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreRoot::Filesystem(path.into()))
    }

    /// Registry that keeps everything in memory.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(StoreRoot::Memory)
    }

    /// Get the cache for `namespace`, opening it on first use.
    pub fn open(&self, namespace: &str) -> PersistentCache {
        let mut opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        opened
            .entry(namespace.to_owned())
            .or_insert_with(|| {
                tracing::debug!(namespace, "opening persistent cache");
                let store: Arc<dyn Store> = match &self.root {
                    StoreRoot::Filesystem(path) => Arc::new(FilesystemStore::new(path, namespace)),
                    StoreRoot::Memory => Arc::new(MemoryStore::new()),
                };
                PersistentCache::with_store(namespace, store)
            })
            .clone()
    }
}
