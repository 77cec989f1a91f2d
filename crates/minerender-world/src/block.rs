//! Blocks, placement results and multi-block structures.

use std::collections::BTreeMap;

use glam::IVec3;
use minerender_assets::AssetKey;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scene::SceneHandle;

/// A block type with optional state properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block name, optionally namespaced (`"stone"`, `"mymod:ore"`).
    #[serde(rename = "type")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Block {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Key of this block's state definition.
    pub fn state_key(&self) -> Result<AssetKey> {
        Ok(AssetKey::parse("blockstates", &self.name)?)
    }
}

/// A block placed in the world.
#[derive(Debug, Clone)]
pub struct BlockInfo {
    /// World position in blocks.
    pub position: IVec3,
    pub block: Block,
    /// Scene object rendering this block. Not owned: release it through the
    /// scene.
    pub object: SceneHandle,
}

/// Outcome of setting a block.
#[derive(Debug, Clone)]
pub struct PlacedBlock {
    pub info: BlockInfo,
    /// The block previously at this position, already released.
    pub replaced: Option<BlockInfo>,
}

/// A block with its position inside a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiBlockBlock {
    #[serde(flatten)]
    pub block: Block,
    /// World position in blocks.
    pub position: IVec3,
}

/// A set of blocks placed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiBlockStructure {
    pub blocks: Vec<MultiBlockBlock>,
}

impl MultiBlockStructure {
    /// Add a block.
    pub fn push(&mut self, position: impl Into<IVec3>, block: Block) {
        self.blocks.push(MultiBlockBlock {
            block,
            position: position.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_json_shape() {
        let json = r#"{"blocks":[
            {"type":"stone","position":[0,0,0]},
            {"type":"oak_log","properties":{"axis":"y"},"position":[1,2,3]}
        ]}"#;
        let structure: MultiBlockStructure = serde_json::from_str(json).unwrap();

        assert_eq!(structure.blocks.len(), 2);
        assert_eq!(structure.blocks[1].position, IVec3::new(1, 2, 3));
        assert_eq!(structure.blocks[1].block.properties["axis"], "y");
        assert_eq!(
            structure.blocks[1].block.state_key().unwrap().serialize(),
            "minecraft:blockstates/oak_log#json"
        );
    }

    #[test]
    fn test_invalid_name_is_an_asset_error() {
        let err = Block::new("Not Valid").state_key().unwrap_err();
        assert!(matches!(err, crate::Error::Asset(_)));
    }
}
