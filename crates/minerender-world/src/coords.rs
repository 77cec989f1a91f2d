//! Coordinate conversions between world blocks, chunks and scene units.

use glam::{IVec3, Vec3};

/// Blocks along each edge of a chunk.
pub const CHUNK_SIZE: i32 = 16;

/// Scene units per block edge.
pub const SCENE_UNITS_PER_BLOCK: f32 = 16.0;

/// Convert a world position (in blocks) to scene units.
#[must_use]
pub fn world_to_scene_position(pos: Vec3) -> Vec3 {
    pos * SCENE_UNITS_PER_BLOCK
}

/// Convert a scene position back to world blocks.
#[must_use]
pub fn scene_to_world_position(pos: Vec3) -> Vec3 {
    pos / SCENE_UNITS_PER_BLOCK
}

/// Chunk coordinate containing a block, rounding toward negative infinity.
#[must_use]
pub fn chunk_coord(pos: IVec3) -> IVec3 {
    pos.div_euclid(IVec3::splat(CHUNK_SIZE))
}

/// Position of a block relative to its chunk's origin.
#[must_use]
pub fn local_position(pos: IVec3) -> IVec3 {
    pos.rem_euclid(IVec3::splat(CHUNK_SIZE))
}

/// Map key for the chunk containing a block: `"cx_cy_cz"`.
#[must_use]
pub fn world_pos_to_chunk_key(pos: IVec3) -> String {
    let c = chunk_coord(pos);
    format!("{}_{}_{}", c.x, c.y, c.z)
}

/// Linear index of the chunk containing a block, for a world `size` chunks
/// wide.
///
/// Only meaningful while `size` stays fixed; resizing a world invalidates
/// every index computed before.
#[must_use]
pub fn world_pos_to_chunk_index(pos: IVec3, size: i32) -> i32 {
    let c = chunk_coord(pos);
    c.z * size * size + c.y * size + c.x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_scaling_round_trips() {
        let world = Vec3::new(1.0, 2.5, -3.0);
        let scene = world_to_scene_position(world);
        assert_eq!(scene, Vec3::new(16.0, 40.0, -48.0));
        assert_eq!(scene_to_world_position(scene), world);
    }

    #[test]
    fn test_chunk_coord_floors() {
        assert_eq!(chunk_coord(IVec3::new(0, 15, 16)), IVec3::new(0, 0, 1));
        assert_eq!(chunk_coord(IVec3::new(-1, 63, 64)), IVec3::new(-1, 3, 4));
        assert_eq!(local_position(IVec3::new(17, -1, 63)), IVec3::new(1, 15, 15));
    }

    #[test]
    fn test_chunk_key_and_index() {
        let pos = IVec3::new(17, 33, 50);
        assert_eq!(world_pos_to_chunk_key(pos), "1_2_3");
        // 3 * 16 + 2 * 4 + 1.
        assert_eq!(world_pos_to_chunk_index(pos, 4), 57);
        assert_eq!(world_pos_to_chunk_index(IVec3::ZERO, 4), 0);
        assert_eq!(world_pos_to_chunk_index(IVec3::splat(63), 4), 63);
    }
}
