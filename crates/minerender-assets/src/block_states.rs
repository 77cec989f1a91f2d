//! Block state definitions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;

use crate::error::Result;
use crate::key::AssetKey;
use crate::loader::AssetLoader;
use crate::memo::MemoCache;
use crate::types::BlockState;

/// Memoized block state lookup.
#[derive(Debug, Clone)]
pub struct BlockStates {
    loader: AssetLoader,
    cache: MemoCache<Option<Arc<BlockState>>>,
}

impl BlockStates {
    #[must_use]
    pub fn new(loader: AssetLoader) -> Self {
        Self {
            loader,
            cache: MemoCache::new("blockstate"),
        }
    }

    /// Resolve one block state. `Ok(None)` means it does not exist.
    pub async fn get(&self, key: &AssetKey) -> Result<Option<Arc<BlockState>>> {
        self.cache
            .get(&key.serialize(), |_| async {
                Ok(self
                    .loader
                    .load_or_retry_with_defaults::<BlockState>(key)
                    .await
                    .map(Arc::new))
            })
            .await
    }

    /// Resolve every distinct key concurrently.
    ///
    /// Duplicate keys are loaded once. The first error, if any, is returned
    /// after all loads have settled.
    pub async fn get_all<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a AssetKey>,
    ) -> Result<HashMap<AssetKey, Option<Arc<BlockState>>>> {
        let distinct: BTreeSet<&AssetKey> = keys.into_iter().collect();
        tracing::debug!(count = distinct.len(), "preloading block states");

        let results = join_all(
            distinct
                .into_iter()
                .map(|key| async move { (key.clone(), self.get(key).await) }),
        )
        .await;

        results
            .into_iter()
            .map(|(key, state)| state.map(|state| (key, state)))
            .collect()
    }

    /// Whether `key` has been resolved, present or not.
    #[must_use]
    pub fn is_cached(&self, key: &AssetKey) -> bool {
        self.cache.contains(&key.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemorySource;

    #[tokio::test]
    async fn test_get_all_dedupes() {
        let source = MemorySource::new();
        let stone = AssetKey::parse("blockstates", "stone").unwrap();
        let dirt = AssetKey::parse("blockstates", "dirt").unwrap();
        source.insert(&stone, br#"{"variants":{"":{"model":"block/stone"}}}"#.to_vec());

        let states = BlockStates::new(AssetLoader::new(Arc::new(source.clone())));
        let resolved = states.get_all([&stone, &dirt, &stone]).await.unwrap();

        assert_eq!(resolved.len(), 2);
        assert!(resolved[&stone].is_some());
        assert!(resolved[&dirt].is_none());
        assert_eq!(source.fetch_count(&stone), 1);
        assert!(states.is_cached(&dirt));

        // Later lookups are served from memory.
        states.get(&stone).await.unwrap();
        assert_eq!(source.fetch_log().len(), 2);
    }
}
