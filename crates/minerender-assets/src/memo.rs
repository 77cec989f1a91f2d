//! In-process single-flight memoization.
//!
//! [`MemoCache`] maps a canonical key string to a lazily initialised cell.
//! The first caller for a key runs its loader; every caller that arrives while
//! that load is in flight waits on the same cell and observes the same value.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::OnceCell;

use crate::error::Result;

/// What a [`MemoCache`] does with a loader that returned an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Leave the key empty so the next `get` runs a loader again.
    #[default]
    Retry,
    /// Store the error; later callers get it back until [`MemoCache::clear`].
    Cache,
}

type Slot<V> = Arc<OnceCell<Result<V>>>;

/// Async memoization keyed by string, with at most one load per key in flight.
///
/// Values are handed out by clone, so large payloads should be wrapped in an
/// `Arc` by the caller.
#[derive(Debug)]
pub struct MemoCache<V> {
    name: &'static str,
    policy: FailurePolicy,
    slots: Arc<Mutex<HashMap<String, Slot<V>>>>,
}

impl<V> Clone for MemoCache<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            policy: self.policy,
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<V: Clone> MemoCache<V> {
    /// Create an empty cache that retries failed loads.
    ///
    /// `name` identifies the category in log output.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self::with_policy(name, FailurePolicy::default())
    }

    /// Create an empty cache with an explicit failure policy.
    #[must_use]
    pub fn with_policy(name: &'static str, policy: FailurePolicy) -> Self {
        Self {
            name,
            policy,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the value for `key`, running `loader` only if no value is
    /// resolved or in flight.
    pub async fn get<F, Fut>(&self, key: &str, loader: F) -> Result<V>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        // The slot is reserved before any await, so concurrent callers for
        // the same key always find the same cell.
        let slot = Arc::clone(self.lock().entry(key.to_owned()).or_default());

        if let Some(value) = slot.get() {
            tracing::debug!(cache = self.name, key, "memo hit");
            return value.clone();
        }

        let owned_key = key.to_owned();
        match self.policy {
            FailurePolicy::Retry => slot
                .get_or_try_init(|| async move {
                    tracing::debug!(cache = self.name, key = %owned_key, "memo miss");
                    loader(owned_key).await.map(Ok)
                })
                .await?
                .clone(),
            FailurePolicy::Cache => slot
                .get_or_init(|| async move {
                    tracing::debug!(cache = self.name, key = %owned_key, "memo miss");
                    loader(owned_key).await
                })
                .await
                .clone(),
        }
    }

    /// Whether `key` has a resolved entry. In-flight loads do not count.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().get(key).is_some_and(|slot| slot.initialized())
    }

    /// Number of resolved entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Loads already in flight finish for their own waiters
    /// but are not visible to later calls.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot<V>>> {
        // Entries are only inserted or removed whole, so a panic elsewhere
        // cannot leave the map inconsistent.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
