//! Sparse chunked block worlds rendered through an instancing scene.
//!
//! A [`MineRenderWorld`] stores blocks in 16x16x16 [`Chunk`]s that are only
//! allocated when first written. Each placed block is backed by a
//! [`SceneObject`]; blocks sharing a block state share one pooled object in
//! the [`Scene`] and only differ by instance transform. Standalone models are
//! pooled the same way by model key.
//!
//! # Example
//!
//! ```ignore
//! use minerender_world::{Block, MineRenderWorld, MultiBlockStructure, Scene};
//!
//! let world = MineRenderWorld::new(Arc::new(Scene::new()), assets);
//! world.set_block_at((0, 0, 0), Block::new("stone")).await?;
//!
//! let structure: MultiBlockStructure = serde_json::from_str(&json)?;
//! let report = world.place_multi_block(&structure, true).await?;
//! ```

pub mod batch;
pub mod block;
pub mod block_object;
pub mod chunk;
pub mod coords;
mod error;
pub mod model_object;
pub mod scene;
pub mod world;

pub use batch::{BatchConfig, BatchedExecutor};
pub use block::{Block, BlockInfo, MultiBlockBlock, MultiBlockStructure, PlacedBlock};
pub use block_object::{Appearance, BlockAsset, BlockObject};
pub use chunk::Chunk;
pub use coords::{CHUNK_SIZE, SCENE_UNITS_PER_BLOCK};
pub use error::{Error, Result};
pub use model_object::{ModelAsset, ModelObject};
pub use scene::{
    AddOptions, InstancePool, InstanceRef, ObjectId, Scene, SceneAsset, SceneHandle, SceneObject,
    SceneStatsSnapshot,
};
pub use world::{MineRenderWorld, Placement, PlacementReport, WorldConfig};
