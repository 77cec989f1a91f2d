//! Durable key-value stores.
//!
//! This module provides a `Store` trait and implementations that back the
//! [`PersistentCache`](crate::persistent::PersistentCache) tier.
//!
//! # Implementations
//!
//! - [`FilesystemStore`]: One file per entry under a namespace directory
//! - [`MemoryStore`]: In-memory map, lost on restart (tests, WASM)

use crate::error::{Error, Result};
use std::{
    collections::HashMap,
    future::Future,
    io,
    path::{Path, PathBuf},
    pin::Pin,
    sync::{Arc, PoisonError, RwLock},
};

/// Future type for store get operations.
pub type GetFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>>;

/// Future type for store put/remove/clear operations.
pub type StoreFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Future type for store contains operations.
pub type ContainsFuture<'a> = Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

/// A durable store for serialized values.
///
/// Keys are canonical asset key strings and values are opaque bytes. A store
/// instance covers exactly one namespace.
pub trait Store: Send + Sync {
    /// Get a value.
    ///
    /// Returns `Ok(Some(data))` if present, `Ok(None)` if not, or an error if
    /// the store could not be read.
    fn get(&self, key: &str) -> GetFuture<'_>;

    /// Store a value, replacing any previous one.
    fn put(&self, key: &str, data: Vec<u8>) -> StoreFuture<'_>;

    /// Check if a value exists without reading it.
    fn contains(&self, key: &str) -> ContainsFuture<'_>;

    /// Remove a value.
    fn remove(&self, key: &str) -> StoreFuture<'_>;

    /// Remove every value in this namespace.
    fn clear(&self) -> StoreFuture<'_>;
}

/// A store that keeps values in memory.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> GetFuture<'_> {
        let result = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        Box::pin(async move { Ok(result) })
    }

    fn put(&self, key: &str, data: Vec<u8>) -> StoreFuture<'_> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), data);
        Box::pin(async { Ok(()) })
    }

    fn contains(&self, key: &str) -> ContainsFuture<'_> {
        let result = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key);
        Box::pin(async move { Ok(result) })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> StoreFuture<'_> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Box::pin(async { Ok(()) })
    }
}

/// A store that writes one file per entry under `<root>/<namespace>/`.
///
/// File names are the percent-encoded key, so any key maps to a single path
/// component. The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a store for `namespace` under `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            dir: root.as_ref().join(urlencoding::encode(namespace).as_ref()),
        }
    }

    /// Directory holding this namespace's entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.entry", urlencoding::encode(key)))
    }
}

fn store_error(operation: &'static str, e: &io::Error) -> Error {
    Error::Store {
        operation,
        message: e.to_string(),
    }
}

impl Store for FilesystemStore {
    fn get(&self, key: &str) -> GetFuture<'_> {
        let path = self.entry_path(key);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(store_error("get", &e)),
            }
        })
    }

    fn put(&self, key: &str, data: Vec<u8>) -> StoreFuture<'_> {
        let path = self.entry_path(key);
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| store_error("put", &e))?;

            // Write then rename so a crash never leaves a truncated entry.
            let tmp = path.with_extension("tmp");
            tokio::fs::write(&tmp, data)
                .await
                .map_err(|e| store_error("put", &e))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| store_error("put", &e))
        })
    }

    fn contains(&self, key: &str) -> ContainsFuture<'_> {
        let path = self.entry_path(key);
        Box::pin(async move {
            tokio::fs::try_exists(&path)
                .await
                .map_err(|e| store_error("contains", &e))
        })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_> {
        let path = self.entry_path(key);
        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(store_error("remove", &e)),
                _ => Ok(()),
            }
        })
    }

    fn clear(&self) -> StoreFuture<'_> {
        Box::pin(async move {
            match tokio::fs::remove_dir_all(&self.dir).await {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(store_error("clear", &e)),
                _ => Ok(()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put("minecraft:a#png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("minecraft:a#png").await.unwrap(),
            Some(vec![1, 2, 3])
        );
        assert!(store.contains("minecraft:a#png").await.unwrap());
        assert!(!store.contains("minecraft:b#png").await.unwrap());

        store.remove("minecraft:a#png").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_filesystem_store_survives_reopen() {
        let root = tempfile::tempdir().unwrap();
        let key = "minecraft:textures/block/stone#png.mcmeta";

        let store = FilesystemStore::new(root.path(), "texturemeta");
        assert_eq!(store.get(key).await.unwrap(), None);
        store.put(key, b"{}".to_vec()).await.unwrap();

        // A fresh handle on the same directory sees the entry.
        let reopened = FilesystemStore::new(root.path(), "texturemeta");
        assert_eq!(reopened.get(key).await.unwrap(), Some(b"{}".to_vec()));
        assert!(reopened.contains(key).await.unwrap());

        // Other namespaces are isolated.
        let other = FilesystemStore::new(root.path(), "other");
        assert_eq!(other.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_filesystem_store_clear() {
        let root = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(root.path(), "ns");

        // Clearing a namespace that was never written is fine.
        store.clear().await.unwrap();

        store.put("a", vec![1]).await.unwrap();
        store.put("b", vec![2]).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), None);

        store.put("a", vec![3]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(vec![3]));
    }
}
