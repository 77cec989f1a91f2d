//! Resolved asset values.
//!
//! Every value carries the [`AssetKey`] it was resolved from, so a cached
//! value can be traced back to its identity even when stored by string.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::AssetKey;

/// The kind of file a loader is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Encoded image (PNG).
    Image,
    /// Texture metadata (`.mcmeta` JSON).
    Meta,
    /// Block state definition (JSON).
    BlockState,
    /// Block or item model (JSON).
    Model,
}

/// An encoded texture as fetched from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAsset {
    /// The key this texture was resolved from.
    pub key: AssetKey,
    /// Encoded image bytes.
    pub data: Arc<[u8]>,
}

impl TextureAsset {
    /// Decode into RGBA pixels.
    pub fn decode(&self) -> Result<PixelData> {
        let image = image::load_from_memory(&self.data).map_err(|e| Error::Decode {
            key: self.key.serialize(),
            message: e.to_string(),
        })?;
        let rgba = image.into_rgba8();
        Ok(PixelData {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw().into(),
        })
    }
}

/// Decoded pixels, 4 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 pixel data.
    pub rgba: Arc<[u8]>,
}

/// Texture metadata from a `.mcmeta` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureMeta {
    /// The key this metadata was resolved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<AssetKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Animation>,
}

/// Animation section of texture metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    /// Ticks per frame.
    #[serde(default = "default_frametime")]
    pub frametime: u32,
    #[serde(default)]
    pub interpolate: bool,
    /// Explicit frame order; empty means every frame in sequence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<AnimationFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

fn default_frametime() -> u32 {
    1
}

/// One entry of an animation's frame list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnimationFrame {
    /// Frame index using the default frame time.
    Index(u32),
    /// Frame index with its own duration in ticks.
    Timed { index: u32, time: u32 },
}

/// A block state definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    /// The key this definition was resolved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<AssetKey>,
    /// Variant string (e.g. `"facing=north"`, or `""`) to model reference.
    #[serde(default)]
    pub variants: BTreeMap<String, Variant>,
}

/// Model reference for one block state variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Model name, e.g. `"minecraft:block/stone"` or `"block/stone"`.
    pub model: String,
}

impl BlockState {
    /// The variant used when no properties are given.
    ///
    /// Prefers the empty variant string and otherwise takes the first in
    /// sorted order.
    #[must_use]
    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants
            .get("")
            .or_else(|| self.variants.values().next())
    }
}

impl Variant {
    /// Key of the texture conventionally named after this variant's model.
    ///
    /// `block/stone` resolves to `textures/block/stone.png`.
    pub fn texture_key(&self) -> Result<AssetKey> {
        AssetKey::parse("textures", &self.model)
    }
}

/// Texture variables followed before giving up on a `#` reference chain.
const MAX_TEXTURE_REFERENCES: usize = 8;

/// A block or item model from `models/<name>.json`.
///
/// Only the texture table is modelled; geometry comes from the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// The key this model was resolved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<AssetKey>,
    /// Parent model name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Texture variable to texture name or `#variable` reference.
    #[serde(default)]
    pub textures: BTreeMap<String, String>,
}

impl Model {
    /// Resolve a texture variable, following `#` references.
    ///
    /// Returns `None` for unknown variables, dangling references and cycles.
    #[must_use]
    pub fn resolve_texture(&self, variable: &str) -> Option<&str> {
        let mut current = self.textures.get(variable)?;
        for _ in 0..MAX_TEXTURE_REFERENCES {
            match current.strip_prefix('#') {
                Some(next) => current = self.textures.get(next)?,
                None => return Some(current),
            }
        }
        None
    }

    /// Key of the texture that best represents the whole model.
    ///
    /// Tries `all`, then `particle`, then every other variable in sorted
    /// order. `Ok(None)` if the model names no usable texture.
    pub fn primary_texture_key(&self) -> Result<Option<AssetKey>> {
        let texture = ["all", "particle"]
            .into_iter()
            .chain(self.textures.keys().map(String::as_str))
            .find_map(|variable| self.resolve_texture(variable));
        texture
            .map(|name| AssetKey::parse("textures", name))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_parses_mcmeta_shape() {
        let json = r#"{"animation":{"frametime":2,"frames":[0,{"index":1,"time":5}]}}"#;
        let meta: TextureMeta = serde_json::from_str(json).unwrap();
        let animation = meta.animation.unwrap();
        assert_eq!(animation.frametime, 2);
        assert!(!animation.interpolate);
        assert_eq!(
            animation.frames,
            vec![
                AnimationFrame::Index(0),
                AnimationFrame::Timed { index: 1, time: 5 }
            ]
        );
    }

    #[test]
    fn test_block_state_default_variant() {
        let json = r#"{"variants": {
            "axis=y": {"model": "block/log"},
            "axis=x": {"model": "block/log_x"}
        }}"#;
        let state: BlockState = serde_json::from_str(json).unwrap();
        // No empty variant: first in sorted order.
        assert_eq!(state.default_variant().unwrap().model, "block/log_x");

        let texture = state.default_variant().unwrap().texture_key().unwrap();
        assert_eq!(texture.serialize(), "minecraft:textures/block/log_x#png");
    }

    #[test]
    fn test_model_texture_references() {
        let json = r##"{
            "parent": "block/cube",
            "textures": {"side": "#top", "top": "minecraft:block/oak_log_top", "loop": "#loop"}
        }"##;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model.resolve_texture("side"), Some("minecraft:block/oak_log_top"));
        assert_eq!(model.resolve_texture("loop"), None);
        assert_eq!(model.resolve_texture("missing"), None);

        // Neither `all` nor `particle`: first resolvable variable wins.
        let key = model.primary_texture_key().unwrap().unwrap();
        assert_eq!(key.serialize(), "minecraft:textures/block/oak_log_top#png");

        let empty: Model = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.primary_texture_key(), Ok(None));
    }

    #[test]
    fn test_decode_png() {
        let mut png = Vec::new();
        let image = image::RgbaImage::from_pixel(2, 1, image::Rgba([1, 2, 3, 255]));
        image
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let asset = TextureAsset {
            key: AssetKey::new(None, "stone", "png").unwrap(),
            data: png.into(),
        };
        let pixels = asset.decode().unwrap();
        assert_eq!((pixels.width, pixels.height), (2, 1));
        assert_eq!(&pixels.rgba[..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let asset = TextureAsset {
            key: AssetKey::new(None, "stone", "png").unwrap(),
            data: Arc::from(&b"not a png"[..]),
        };
        assert!(matches!(asset.decode(), Err(Error::Decode { .. })));
    }
}
