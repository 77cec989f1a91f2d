//! Chunks: the unit of lazy allocation and disposal.

use std::collections::HashMap;

use glam::IVec3;

use crate::block::BlockInfo;
use crate::coords::{CHUNK_SIZE, chunk_coord, local_position};
use crate::scene::Scene;

/// A 16x16x16 region of blocks.
///
/// The chunk keeps the scene handles of its blocks but does not own the
/// underlying objects; [`Chunk::dispose`] hands them back to the scene.
#[derive(Debug)]
pub struct Chunk {
    coord: IVec3,
    blocks: HashMap<IVec3, BlockInfo>,
}

impl Chunk {
    #[must_use]
    pub fn new(coord: IVec3) -> Self {
        Self {
            coord,
            blocks: HashMap::new(),
        }
    }

    /// Chunk coordinate (world position divided by [`CHUNK_SIZE`]).
    #[must_use]
    pub fn coord(&self) -> IVec3 {
        self.coord
    }

    /// World position of this chunk's minimum corner.
    #[must_use]
    pub fn origin(&self) -> IVec3 {
        self.coord * CHUNK_SIZE
    }

    /// Whether a world position falls inside this chunk.
    #[must_use]
    pub fn contains(&self, pos: IVec3) -> bool {
        chunk_coord(pos) == self.coord
    }

    /// The block at a world position, if any.
    #[must_use]
    pub fn get_block_at(&self, pos: IVec3) -> Option<&BlockInfo> {
        debug_assert!(self.contains(pos), "{pos} is not in chunk {}", self.coord);
        self.blocks.get(&local_position(pos))
    }

    /// Store a placed block, returning the one it replaces.
    ///
    /// The replaced block's handle is not released here.
    pub fn set_block_at(&mut self, info: BlockInfo) -> Option<BlockInfo> {
        debug_assert!(self.contains(info.position));
        self.blocks.insert(local_position(info.position), info)
    }

    /// Remove the block at a world position without releasing it.
    pub fn remove_block_at(&mut self, pos: IVec3) -> Option<BlockInfo> {
        self.blocks.remove(&local_position(pos))
    }

    /// Iterate over every block in the chunk.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockInfo> {
        self.blocks.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Release every block's scene handle through `scene`.
    pub fn dispose(self, scene: &Scene) {
        tracing::debug!(coord = %self.coord, blocks = self.blocks.len(), "disposing chunk");
        for info in self.blocks.into_values() {
            scene.release(&info.object);
        }
    }
}
