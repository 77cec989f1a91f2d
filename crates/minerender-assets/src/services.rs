//! The asset services a world needs, wired together.

use crate::block_states::BlockStates;
use crate::loader::AssetLoader;
use crate::models::Models;
use crate::persistent::CacheDirectory;
use crate::textures::{META_NAMESPACE, TextureService};

/// Loader plus the services built on it.
///
/// Clones share every cache.
#[derive(Debug, Clone)]
pub struct Assets {
    pub loader: AssetLoader,
    pub textures: TextureService,
    pub block_states: BlockStates,
    pub models: Models,
}

impl Assets {
    /// Build services on `loader`, taking durable tiers from `caches`.
    #[must_use]
    pub fn new(loader: AssetLoader, caches: &CacheDirectory) -> Self {
        Self {
            textures: TextureService::new(loader.clone(), caches.open(META_NAMESPACE)),
            block_states: BlockStates::new(loader.clone()),
            models: Models::new(loader.clone()),
            loader,
        }
    }
}
