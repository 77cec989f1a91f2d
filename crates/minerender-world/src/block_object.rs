//! Renderable blocks.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec3;
use minerender_assets::{AssetKey, BlockState, PixelData, TextureMeta, TextureService};

use crate::error::Result;
use crate::scene::{AddOptions, InitFuture, Scene, SceneAsset, SceneHandle, SceneObject};

/// A block state to render, possibly unresolved.
#[derive(Debug, Clone)]
pub struct BlockAsset {
    /// Key of the block state definition.
    pub key: AssetKey,
    /// The definition, or `None` if it could not be loaded.
    pub state: Option<Arc<BlockState>>,
}

impl SceneAsset for BlockAsset {
    fn asset_key(&self) -> Option<&AssetKey> {
        Some(&self.key)
    }
}

/// How a block object ended up looking after initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Appearance {
    /// `init` has not finished.
    Pending,
    /// Textured from its model's texture.
    Textured {
        texture: AssetKey,
        pixels: PixelData,
        meta: Option<TextureMeta>,
    },
    /// Missing block state or texture; drawn with the fallback material.
    Placeholder,
}

/// Scene object for one block state.
pub struct BlockObject {
    asset: BlockAsset,
    textures: TextureService,
    position: Mutex<Vec3>,
    appearance: Mutex<Appearance>,
}

impl BlockObject {
    #[must_use]
    pub fn new(asset: BlockAsset, textures: TextureService) -> Self {
        Self {
            asset,
            textures,
            position: Mutex::new(Vec3::ZERO),
            appearance: Mutex::new(Appearance::Pending),
        }
    }

    #[must_use]
    pub fn asset(&self) -> &BlockAsset {
        &self.asset
    }

    #[must_use]
    pub fn appearance(&self) -> Appearance {
        lock(&self.appearance).clone()
    }

    async fn resolve_appearance(&self) -> Result<Appearance> {
        let variant = self.asset.state.as_ref().and_then(|s| s.default_variant());
        let Some(variant) = variant else {
            tracing::warn!(block = %self.asset.key, "no block state, using placeholder");
            return Ok(Appearance::Placeholder);
        };

        textured_appearance(&self.textures, &self.asset.key, variant.texture_key()?).await
    }
}

/// Resolve `texture` for the object built from `owner`.
///
/// A missing or undecodable texture gives [`Appearance::Placeholder`]. Errors
/// from the metadata tier propagate.
pub(crate) async fn textured_appearance(
    textures: &TextureService,
    owner: &AssetKey,
    texture: AssetKey,
) -> Result<Appearance> {
    let pixels = match textures.get(&texture).await {
        Ok(Some(pixels)) => pixels,
        Ok(None) => {
            tracing::warn!(%owner, %texture, "texture unavailable, using placeholder");
            return Ok(Appearance::Placeholder);
        }
        Err(e) => {
            tracing::warn!(%owner, %texture, "unusable texture, using placeholder: {e}");
            return Ok(Appearance::Placeholder);
        }
    };
    let meta = textures.get_meta(&texture).await?;

    Ok(Appearance::Textured {
        texture,
        pixels,
        meta,
    })
}

impl SceneObject for BlockObject {
    fn init(&self) -> InitFuture<'_> {
        Box::pin(async move {
            let appearance = self.resolve_appearance().await?;
            *lock(&self.appearance) = appearance;
            Ok(())
        })
    }

    fn position(&self) -> Vec3 {
        *lock(&self.position)
    }

    fn set_position(&self, position: Vec3) {
        *lock(&self.position) = position;
    }

    fn label(&self) -> String {
        self.asset.key.to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Scene {
    /// Add a block object for `asset`, pooled by block state key when
    /// `options.instance` is set.
    pub async fn add_block(
        &self,
        asset: &BlockAsset,
        textures: &TextureService,
        options: AddOptions,
    ) -> Result<SceneHandle> {
        self.add_scene_object(
            asset,
            || async {
                let object = BlockObject::new(asset.clone(), textures.clone());
                Ok(Arc::new(object) as Arc<dyn SceneObject>)
            },
            options,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minerender_assets::{AssetLoader, Assets, CacheDirectory, MemorySource};

    fn stock_source(source: &MemorySource, with_texture: bool) -> AssetKey {
        let key = AssetKey::parse("blockstates", "stone").unwrap();
        source.insert(&key, br#"{"variants":{"":{"model":"block/stone"}}}"#.to_vec());
        if with_texture {
            let mut png = Vec::new();
            image::RgbaImage::from_pixel(1, 1, image::Rgba([1, 1, 1, 255]))
                .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
                .unwrap();
            source.insert(&AssetKey::parse("textures", "block/stone").unwrap(), png);
        }
        key
    }

    async fn setup(with_texture: bool) -> (Assets, BlockAsset) {
        let source = MemorySource::new();
        let assets = Assets::new(
            AssetLoader::new(Arc::new(source.clone())),
            &CacheDirectory::memory(),
        );
        let key = stock_source(&source, with_texture);
        let state = assets.block_states.get(&key).await.unwrap();
        assert!(state.is_some());
        (assets, BlockAsset { key, state })
    }

    fn appearance_of(handle: &SceneHandle) -> Appearance {
        handle
            .object()
            .as_any()
            .downcast_ref::<BlockObject>()
            .unwrap()
            .appearance()
    }

    #[tokio::test]
    async fn test_textured_after_init() {
        let (assets, asset) = setup(true).await;
        let scene = Scene::new();
        let handle = scene
            .add_block(&asset, &assets.textures, AddOptions::instanced())
            .await
            .unwrap();

        let Appearance::Textured { texture, pixels, meta } = appearance_of(&handle) else {
            panic!("expected textured block");
        };
        assert_eq!(texture.path(), "textures/block/stone");
        assert_eq!(pixels.width, 1);
        assert_eq!(meta, None);
    }

    #[tokio::test]
    async fn test_missing_texture_uses_placeholder() {
        let (assets, asset) = setup(false).await;
        let scene = Scene::new();
        let handle = scene
            .add_block(&asset, &assets.textures, AddOptions::default())
            .await
            .unwrap();
        assert_eq!(appearance_of(&handle), Appearance::Placeholder);
    }

    #[tokio::test]
    async fn test_missing_state_uses_placeholder() {
        let (assets, mut asset) = setup(true).await;
        asset.state = None;
        let scene = Scene::new();
        let handle = scene
            .add_block(&asset, &assets.textures, AddOptions::default())
            .await
            .unwrap();
        assert_eq!(appearance_of(&handle), Appearance::Placeholder);
    }
}
