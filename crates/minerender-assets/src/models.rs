//! Model definitions.

use std::sync::Arc;

use crate::error::Result;
use crate::key::AssetKey;
use crate::loader::AssetLoader;
use crate::memo::MemoCache;
use crate::types::Model;

/// Memoized model lookup.
#[derive(Debug, Clone)]
pub struct Models {
    loader: AssetLoader,
    cache: MemoCache<Option<Arc<Model>>>,
}

impl Models {
    #[must_use]
    pub fn new(loader: AssetLoader) -> Self {
        Self {
            loader,
            cache: MemoCache::new("model"),
        }
    }

    /// Resolve a model key. `Ok(None)` means it does not exist.
    pub async fn get(&self, key: &AssetKey) -> Result<Option<Arc<Model>>> {
        self.cache
            .get(&key.serialize(), |_| async {
                Ok(self
                    .loader
                    .load_or_retry_with_defaults::<Model>(key)
                    .await
                    .map(Arc::new))
            })
            .await
    }

    /// Resolve a model by name, e.g. `"block/stone"` or `"minecraft:item/apple"`.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Arc<Model>>> {
        self.get(&AssetKey::parse("models", name)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemorySource;

    #[tokio::test]
    async fn test_concurrent_lookups_fetch_once() {
        let source = MemorySource::new().with_latency(std::time::Duration::from_millis(5));
        let key = AssetKey::parse("models", "block/stone").unwrap();
        source.insert(&key, br#"{"textures":{"all":"block/stone"}}"#.to_vec());

        let models = Models::new(AssetLoader::new(Arc::new(source.clone())));
        let (a, b) = tokio::join!(models.get(&key), models.get_by_name("block/stone"));
        let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.key, Some(key.clone()));
        assert_eq!(source.fetch_count(&key), 1);
        assert_eq!(models.get_by_name("block/missing").await, Ok(None));
    }
}
