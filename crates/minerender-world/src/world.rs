//! The block world.
//!
//! A [`MineRenderWorld`] is a sparse map of chunk key to [`Chunk`]. Chunks are
//! created on first write and never on read. Every position is checked against
//! the world bounds before anything else happens.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::join_all;
use glam::IVec3;
use minerender_assets::{AssetKey, Assets};

use crate::batch::{BatchConfig, BatchedExecutor};
use crate::block::{Block, BlockInfo, MultiBlockBlock, MultiBlockStructure, PlacedBlock};
use crate::block_object::BlockAsset;
use crate::chunk::Chunk;
use crate::coords::{
    CHUNK_SIZE, chunk_coord, world_pos_to_chunk_index, world_pos_to_chunk_key,
    world_to_scene_position,
};
use crate::error::{Error, Result};
use crate::scene::{AddOptions, Scene};

/// World tuning.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Chunks along each axis.
    pub size: u32,
    /// Batching used by [`MineRenderWorld::place_multi_block`].
    pub batch: BatchConfig,
    /// Pool block objects by block state in the scene.
    pub instance_blocks: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: 4,
            batch: BatchConfig::default(),
            instance_blocks: true,
        }
    }
}

/// Outcome of one queued placement.
pub type Placement = (IVec3, Result<PlacedBlock>);

/// Result of placing a structure.
#[derive(Debug, Default)]
pub struct PlacementReport {
    /// Blocks placed successfully.
    pub placed: usize,
    /// Entries skipped because a later entry targets the same position.
    pub superseded: usize,
    /// Blocks that could not be placed, with the reason.
    pub failures: Vec<(IVec3, Error)>,
}

/// A sparse, chunked block world rendered into a shared scene.
pub struct MineRenderWorld {
    scene: Arc<Scene>,
    assets: Assets,
    config: WorldConfig,
    chunks: Mutex<HashMap<String, Chunk>>,
}

impl std::fmt::Debug for MineRenderWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MineRenderWorld")
            .field("config", &self.config)
            .field("chunks", &self.chunk_count())
            .finish_non_exhaustive()
    }
}

impl MineRenderWorld {
    /// Create an empty world with the default configuration.
    #[must_use]
    pub fn new(scene: Arc<Scene>, assets: Assets) -> Self {
        Self::with_config(scene, assets, WorldConfig::default())
    }

    #[must_use]
    pub fn with_config(scene: Arc<Scene>, assets: Assets, config: WorldConfig) -> Self {
        Self {
            scene,
            assets,
            config,
            chunks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    #[must_use]
    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    /// Chunks along each axis.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.config.size
    }

    /// Exclusive upper bound of block coordinates on every axis.
    #[must_use]
    pub fn block_size(&self) -> i32 {
        i32::try_from(self.config.size)
            .unwrap_or(i32::MAX)
            .saturating_mul(CHUNK_SIZE)
    }

    /// The block at `pos`, which may be `(x, y, z)`, `[x, y, z]` or an
    /// `IVec3`.
    ///
    /// Returns `Ok(None)` without allocating anything when the chunk was never
    /// written.
    pub fn get_block_at(&self, pos: impl Into<IVec3>) -> Result<Option<BlockInfo>> {
        let pos = pos.into();
        self.validate_pos_bounds(pos)?;

        let chunks = self.chunks();
        let Some(chunk) = chunks.get(&world_pos_to_chunk_key(pos)) else {
            return Ok(None);
        };
        Ok(chunk.get_block_at(pos).cloned())
    }

    /// Place `block` at `pos`, replacing and releasing any previous block.
    ///
    /// The block's scene object is resolved first; the owning chunk is only
    /// created once there is a block to store. A failed build leaves the world
    /// untouched.
    pub async fn set_block_at(&self, pos: impl Into<IVec3>, block: Block) -> Result<PlacedBlock> {
        let pos = pos.into();
        self.validate_pos_bounds(pos)?;
        let info = self.build_block(pos, block).await?;

        let replaced = self
            .chunks()
            .entry(world_pos_to_chunk_key(pos))
            .or_insert_with(|| Self::create_chunk(pos))
            .set_block_at(info.clone());
        if let Some(old) = &replaced {
            self.scene.release(&old.object);
        }

        Ok(PlacedBlock { info, replaced })
    }

    async fn build_block(&self, position: IVec3, block: Block) -> Result<BlockInfo> {
        let key = block.state_key()?;
        let state = self.assets.block_states.get(&key).await?;
        let options = AddOptions {
            instance: self.config.instance_blocks,
        };
        let object = self
            .scene
            .add_block(&BlockAsset { key, state }, &self.assets.textures, options)
            .await?;
        object.set_position(world_to_scene_position(position.as_vec3()));

        Ok(BlockInfo {
            position,
            block,
            object,
        })
    }

    fn create_chunk(pos: IVec3) -> Chunk {
        let coord = chunk_coord(pos);
        tracing::debug!(%coord, "creating chunk");
        Chunk::new(coord)
    }

    /// Place every block of `structure`.
    ///
    /// With `use_batches` placements go through a [`BatchedExecutor`] built
    /// from this world's [`BatchConfig`]; otherwise they all start at once.
    /// See [`place_multi_block_with`](Self::place_multi_block_with).
    pub async fn place_multi_block(
        &self,
        structure: &MultiBlockStructure,
        use_batches: bool,
    ) -> Result<PlacementReport> {
        if use_batches {
            let mut executor = BatchedExecutor::new(self.config.batch.clone());
            self.place_multi_block_with(structure, Some(&mut executor))
                .await
        } else {
            self.place_multi_block_with(structure, None).await
        }
    }

    /// Place every block of `structure`, batching through `executor` if one
    /// is given.
    ///
    /// When several entries target one position only the last is placed, so
    /// the result matches placing the entries in order. All distinct block
    /// states are loaded first, so no placement waits on a fetch.
    ///
    /// Tasks already queued on `executor` run in the same batches and count
    /// towards the report. Individual failures are collected rather than
    /// aborting the rest. An invalid block name or a failed preload fails the
    /// whole call before anything is placed.
    pub async fn place_multi_block_with<'a>(
        &'a self,
        structure: &MultiBlockStructure,
        executor: Option<&mut BatchedExecutor<'a, Placement>>,
    ) -> Result<PlacementReport> {
        let blocks = last_per_position(structure);
        let keys = blocks
            .iter()
            .map(|b| b.block.state_key())
            .collect::<Result<Vec<AssetKey>>>()?;
        self.assets.block_states.get_all(&keys).await?;

        let place = |b: &MultiBlockBlock| {
            let position = b.position;
            let block = b.block.clone();
            async move { (position, self.set_block_at(position, block).await) }
        };

        let results = match executor {
            Some(executor) => {
                for b in &blocks {
                    executor.submit(place(b));
                }
                executor.run().await
            }
            None => join_all(blocks.iter().map(|b| place(b))).await,
        };

        let mut report = PlacementReport {
            superseded: structure.blocks.len() - blocks.len(),
            ..PlacementReport::default()
        };
        for (position, result) in results {
            match result {
                Ok(_) => report.placed += 1,
                Err(e) => {
                    tracing::warn!(%position, "failed to place block: {e}");
                    report.failures.push((position, e));
                }
            }
        }
        tracing::info!(
            placed = report.placed,
            superseded = report.superseded,
            failed = report.failures.len(),
            "placed structure"
        );
        Ok(report)
    }

    /// Dispose every chunk, releasing their blocks from the scene.
    pub fn clear(&self) {
        let chunks = std::mem::take(&mut *self.chunks());
        tracing::info!(chunks = chunks.len(), "clearing world");
        for chunk in chunks.into_values() {
            chunk.dispose(&self.scene);
        }
    }

    /// Whether the chunk containing `pos` exists.
    #[must_use]
    pub fn has_chunk_at(&self, pos: impl Into<IVec3>) -> bool {
        self.chunks()
            .contains_key(&world_pos_to_chunk_key(pos.into()))
    }

    /// Number of allocated chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks().len()
    }

    /// Number of placed blocks across all chunks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.chunks().values().map(Chunk::len).sum()
    }

    /// Linear index of the chunk containing `pos` for this world's size.
    #[must_use]
    pub fn world_pos_to_chunk_index(&self, pos: impl Into<IVec3>) -> i32 {
        let size = i32::try_from(self.config.size).unwrap_or(i32::MAX);
        world_pos_to_chunk_index(pos.into(), size)
    }

    /// Fail unless every axis of `pos` is in `0..block_size()`.
    pub fn validate_pos_bounds(&self, pos: IVec3) -> Result<()> {
        let limit = self.block_size();
        if pos.cmplt(IVec3::ZERO).any() || pos.cmpge(IVec3::splat(limit)).any() {
            return Err(Error::OutOfBounds {
                position: pos,
                limit,
            });
        }
        Ok(())
    }

    fn chunks(&self) -> MutexGuard<'_, HashMap<String, Chunk>> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The entries of `structure` that are not overwritten by a later entry at
/// the same position, in structure order.
fn last_per_position(structure: &MultiBlockStructure) -> Vec<&MultiBlockBlock> {
    let last: HashMap<IVec3, usize> = structure
        .blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (b.position, i))
        .collect();
    structure
        .blocks
        .iter()
        .enumerate()
        .filter(|(i, b)| last.get(&b.position) == Some(i))
        .map(|(_, b)| b)
        .collect()
}
