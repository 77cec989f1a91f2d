//! Asset resolution for MineRender worlds.
//!
//! This crate turns [`AssetKey`]s into textures, texture metadata, block
//! state definitions and models, caching aggressively along the way.
//!
//! # Design principles
//!
//! - **Single-flight**: Concurrent requests for one key share one load
//! - **Absence is data**: A missing asset is `None`, never an error
//! - **Two tiers**: Metadata is also persisted, pixel data stays in memory
//!
//! # Example
//!
//! ```ignore
//! use minerender_assets::{AssetKey, AssetLoader, Assets, CacheDirectory, DirectorySource};
//!
//! let loader = AssetLoader::new(Arc::new(DirectorySource::new("resourcepack")));
//! let assets = Assets::new(loader, &CacheDirectory::filesystem(".cache"));
//!
//! let stone = AssetKey::parse("textures", "block/stone")?;
//! let pixels = assets.textures.get(&stone).await?;
//! let meta = assets.textures.get_meta(&stone).await?;
//! ```

pub mod block_states;
mod error;
mod key;
pub mod loader;
pub mod memo;
pub mod models;
pub mod persistent;
mod services;
pub mod store;
pub mod textures;
pub mod types;

pub use block_states::BlockStates;
pub use error::{Error, Result};
pub use key::{AssetKey, DEFAULT_NAMESPACE, META_SUFFIX};
pub use loader::{
    AssetLoader, AssetSource, DirectorySource, HttpSource, LoadableAsset, MemorySource,
};
pub use memo::{FailurePolicy, MemoCache};
pub use models::Models;
pub use persistent::{CacheDirectory, PersistentCache, StoreRoot};
pub use services::Assets;
pub use store::{FilesystemStore, MemoryStore, Store};
pub use textures::{META_NAMESPACE, TextureService};
pub use types::{
    Animation, AnimationFrame, AssetKind, BlockState, Model, PixelData, TextureAsset,
    TextureMeta, Variant,
};
