//! Texture and texture metadata resolution.
//!
//! Pixel data is memoized in memory for the life of the service. Metadata is
//! memoized in memory on top of a [`PersistentCache`], since it changes rarely
//! and is cheap to keep on disk indefinitely.

use crate::error::Result;
use crate::key::AssetKey;
use crate::loader::AssetLoader;
use crate::memo::MemoCache;
use crate::persistent::PersistentCache;
use crate::types::{PixelData, TextureAsset, TextureMeta};

/// Namespace of the durable texture metadata tier.
pub const META_NAMESPACE: &str = "minerender-texturemeta";

/// Resolves textures and their metadata through a two-tier cache.
#[derive(Debug, Clone)]
pub struct TextureService {
    loader: AssetLoader,
    textures: MemoCache<Option<TextureAsset>>,
    metas: MemoCache<Option<TextureMeta>>,
    meta_store: PersistentCache,
}

impl TextureService {
    /// Create a service loading through `loader` and persisting metadata in
    /// `meta_store`, usually the [`META_NAMESPACE`] cache.
    #[must_use]
    pub fn new(loader: AssetLoader, meta_store: PersistentCache) -> Self {
        Self {
            loader,
            textures: MemoCache::new("texture"),
            metas: MemoCache::new("texture-meta"),
            meta_store,
        }
    }

    /// Resolve `key` to RGBA pixels.
    ///
    /// `Ok(None)` means the texture is unavailable from every source. An
    /// error means the bytes were found but are not a decodable image.
    pub async fn get(&self, key: &AssetKey) -> Result<Option<PixelData>> {
        match self.preload(key).await? {
            Some(asset) => asset.decode().map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the encoded texture for `key` without decoding it.
    ///
    /// Concurrent calls for one key share a single fetch, and the result,
    /// including absence, is kept for the life of the service.
    pub async fn preload(&self, key: &AssetKey) -> Result<Option<TextureAsset>> {
        self.textures
            .get(&key.serialize(), |_| async {
                Ok(self.loader.load_or_retry_with_defaults(key).await)
            })
            .await
    }

    /// Resolve the `.mcmeta` metadata belonging to `key`.
    ///
    /// `key` may be the texture key or the metadata key itself. Only metadata
    /// that exists is persisted; absence is remembered in memory for the life
    /// of the service.
    pub async fn get_meta(&self, key: &AssetKey) -> Result<Option<TextureMeta>> {
        let meta_key = key.derive_meta();
        let serialized = meta_key.serialize();
        self.metas
            .get(&serialized, |_| async {
                self.meta_store
                    .get_or_load_present(&serialized, |_| async {
                        Ok(self.loader.load_or_retry_with_defaults(&meta_key).await)
                    })
                    .await
            })
            .await
    }

    /// Clear the durable metadata tier.
    ///
    /// In-memory tiers are left alone; they last until the service is
    /// dropped.
    pub async fn clear_cache(&self) -> Result<()> {
        self.meta_store.clear().await
    }
}
