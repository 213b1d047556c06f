//! Shared constants for import, LOD computation and runtime selection.

/// Side length of a chunk in world units (one voxel = one unit).
pub const CHUNK_SIZE: u32 = 100;

/// Side length of the addressable world volume in world units.
pub const WORLD_SIZE: u32 = 2000;

/// Number of chunks along each world axis.
pub const WORLD_CHUNKS_PER_AXIS: u32 = WORLD_SIZE / CHUNK_SIZE;

/// Total number of chunk cells in the addressable world (20^3).
pub const WORLD_CHUNK_COUNT: u32 =
    WORLD_CHUNKS_PER_AXIS * WORLD_CHUNKS_PER_AXIS * WORLD_CHUNKS_PER_AXIS;

/// Number of local cells inside one chunk (100^3).
pub const CHUNK_VOLUME: u32 = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Offset applied to scene coordinates so the scene origin sits at the
/// middle of the addressable world.
pub const WORLD_ORIGIN_OFFSET: i32 = (WORLD_SIZE / 2) as i32;

/// Number of palette / material slots addressed by an 8-bit color index.
pub const MATERIAL_SLOTS: usize = 256;

/// Precomputed detail levels, finest first. Lower is higher detail.
pub const LOD_LEVELS: [u32; 3] = [1, 2, 4];

/// Catalog slots reserved per chunk (one per LOD level).
pub const LOD_SLOTS_PER_CHUNK: u32 = LOD_LEVELS.len() as u32;

/// Total number of chunk catalog slots.
pub const CATALOG_SLOT_COUNT: u32 = WORLD_CHUNK_COUNT * LOD_SLOTS_PER_CHUNK;

/// Bytes per packed voxel record (two u32 values).
pub const VOXEL_RECORD_BYTES: u32 = 8;

/// Minimum gap enforced between the LOD0 and LOD1 distance thresholds.
pub const MIN_LOD_MARGIN: f32 = 50.0;

/// Hard ceiling of instances accepted by a single acceleration-structure call.
pub const MAX_INSTANCES_PER_CALL: usize = 1_048_575;

/// Capacity tier granularity for the voxel instance buffer.
pub const STEP_CAPACITY: u32 = 100_000;

/// Largest capacity tier the instancing backend is configured for.
pub const MAX_CAPACITY: u32 = 5_000_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_chunk_count() {
        assert_eq!(WORLD_CHUNKS_PER_AXIS, 20);
        assert_eq!(WORLD_CHUNK_COUNT, 8000);
    }

    #[test]
    fn test_catalog_slot_count_fits_record_field() {
        // VoxelRecord stores the catalog slot in 20 bits.
        assert!(CATALOG_SLOT_COUNT < (1 << 20));
    }

    #[test]
    fn test_chunk_size_fits_position_field() {
        // VoxelRecord stores each local axis in 7 bits.
        assert!(CHUNK_SIZE <= 128);
    }
}
