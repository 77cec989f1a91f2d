//! Renderable standalone models.

use std::any::Any;
use std::sync::{Arc, Mutex};

use glam::Vec3;
use minerender_assets::{AssetKey, Model, TextureService};

use crate::block_object::{Appearance, lock, textured_appearance};
use crate::error::Result;
use crate::scene::{AddOptions, InitFuture, Scene, SceneAsset, SceneHandle, SceneObject};

/// A model to render, possibly unresolved.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    /// Key of the model definition.
    pub key: AssetKey,
    /// The definition, or `None` if it could not be loaded.
    pub model: Option<Arc<Model>>,
}

impl SceneAsset for ModelAsset {
    fn asset_key(&self) -> Option<&AssetKey> {
        Some(&self.key)
    }
}

impl SceneAsset for Model {
    fn asset_key(&self) -> Option<&AssetKey> {
        self.key.as_ref()
    }
}

/// Scene object for one model.
pub struct ModelObject {
    asset: ModelAsset,
    textures: TextureService,
    position: Mutex<Vec3>,
    appearance: Mutex<Appearance>,
}

impl ModelObject {
    #[must_use]
    pub fn new(asset: ModelAsset, textures: TextureService) -> Self {
        Self {
            asset,
            textures,
            position: Mutex::new(Vec3::ZERO),
            appearance: Mutex::new(Appearance::Pending),
        }
    }

    #[must_use]
    pub fn asset(&self) -> &ModelAsset {
        &self.asset
    }

    #[must_use]
    pub fn appearance(&self) -> Appearance {
        lock(&self.appearance).clone()
    }

    async fn resolve_appearance(&self) -> Result<Appearance> {
        let Some(model) = &self.asset.model else {
            tracing::warn!(model = %self.asset.key, "no model, using placeholder");
            return Ok(Appearance::Placeholder);
        };
        let Some(texture) = model.primary_texture_key()? else {
            tracing::warn!(model = %self.asset.key, "model names no texture, using placeholder");
            return Ok(Appearance::Placeholder);
        };
        textured_appearance(&self.textures, &self.asset.key, texture).await
    }
}

impl SceneObject for ModelObject {
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

impl Scene {
    /// Add a model object for `asset`, pooled by model key when
    /// `options.instance` is set.
    pub async fn add_model(
        &self,
        asset: &ModelAsset,
        textures: &TextureService,
        options: AddOptions,
    ) -> Result<SceneHandle> {
        self.add_scene_object(
            asset,
            || async {
                let object = ModelObject::new(asset.clone(), textures.clone());
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

    fn png() -> Vec<u8> {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 2, image::Rgba([4, 5, 6, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    async fn apple(source: &MemorySource, assets: &Assets) -> ModelAsset {
        let key = AssetKey::parse("models", "item/apple").unwrap();
        source.insert(
            &key,
            br##"{"textures":{"layer0":"#apple","apple":"item/apple"}}"##.to_vec(),
        );
        source.insert(&AssetKey::parse("textures", "item/apple").unwrap(), png());
        let model = assets.models.get(&key).await.unwrap();
        ModelAsset { key, model }
    }

    fn appearance_of(handle: &SceneHandle) -> Appearance {
        handle
            .object()
            .as_any()
            .downcast_ref::<ModelObject>()
            .unwrap()
            .appearance()
    }

    #[tokio::test]
    async fn test_pooled_models_share_one_object() {
        let source = MemorySource::new();
        let assets = Assets::new(
            AssetLoader::new(Arc::new(source.clone())),
            &CacheDirectory::memory(),
        );
        let asset = apple(&source, &assets).await;
        let scene = Scene::new();

        let (a, b) = tokio::join!(
            scene.add_model(&asset, &assets.textures, AddOptions::instanced()),
            scene.add_model(&asset, &assets.textures, AddOptions::instanced()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.is_instance() && b.is_instance());
        assert!(Arc::ptr_eq(a.object(), b.object()));
        let stats = scene.stats();
        assert_eq!(
            (stats.object_count, stats.pool_count, stats.instance_count),
            (1, 1, 2)
        );
        assert!(scene.pool(&asset.key.serialize()).is_some());

        let Appearance::Textured { texture, pixels, .. } = appearance_of(&a) else {
            panic!("expected textured model");
        };
        assert_eq!(texture.path(), "textures/item/apple");
        assert_eq!((pixels.width, pixels.height), (2, 2));
        // One texture fetch, one meta fetch, one model fetch.
        assert_eq!(source.fetch_log().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_model_uses_placeholder() {
        let assets = Assets::new(
            AssetLoader::new(Arc::new(MemorySource::new())),
            &CacheDirectory::memory(),
        );
        let key = AssetKey::parse("models", "block/ghost").unwrap();
        let model = assets.models.get(&key).await.unwrap();
        let scene = Scene::new();

        let handle = scene
            .add_model(&ModelAsset { key, model }, &assets.textures, AddOptions::default())
            .await
            .unwrap();
        assert!(!handle.is_instance());
        assert_eq!(appearance_of(&handle), Appearance::Placeholder);
    }
}
