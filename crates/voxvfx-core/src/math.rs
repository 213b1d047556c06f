use glam::{IVec3, UVec3, Vec3};

use crate::constants::{CHUNK_SIZE, LOD_SLOTS_PER_CHUNK, WORLD_CHUNKS_PER_AXIS, WORLD_SIZE};
use crate::direction::FaceMask;
use crate::types::{ChunkCoord, LodLevel, Orientation, VoxelRecord, WorldCoord};

const POS_MASK: u32 = 0x7F;
const COLOR_MASK: u32 = 0xFF;
const SLOT_MASK: u32 = 0xF_FFFF;
const FACE_MASK_BITS: u32 = 0x3F;

/// Linear index of `pos` inside a box of extent `volume` (x fastest, then y, then z).
pub fn grid_index(pos: UVec3, volume: UVec3) -> u32 {
    volume.x * volume.y * pos.z + volume.x * pos.y + pos.x
}

/// Inverse of [`grid_index`].
pub fn grid_position(index: u32, volume: UVec3) -> UVec3 {
    let plane = volume.x * volume.y;
    let z = index / plane;
    let rest = index % plane;
    UVec3::new(rest % volume.x, rest / volume.x, z)
}

fn world_volume() -> UVec3 {
    UVec3::splat(WORLD_CHUNKS_PER_AXIS)
}

fn chunk_volume() -> UVec3 {
    UVec3::splat(CHUNK_SIZE)
}

/// Linear chunk index for an in-bounds chunk coordinate.
pub fn chunk_index(coord: ChunkCoord) -> Option<u32> {
    let axis = WORLD_CHUNKS_PER_AXIS as i32;
    if coord.cmplt(IVec3::ZERO).any() || coord.cmpge(IVec3::splat(axis)).any() {
        return None;
    }
    Some(grid_index(coord.as_uvec3(), world_volume()))
}

/// Chunk coordinate recovered from a linear chunk index.
pub fn chunk_coord(index: u32) -> ChunkCoord {
    grid_position(index, world_volume()).as_ivec3()
}

/// Linear index of a local position inside the chunk volume.
pub fn local_index(local: UVec3) -> u32 {
    grid_index(local, chunk_volume())
}

/// Local position recovered from a linear local index.
pub fn local_position(index: u32) -> UVec3 {
    grid_position(index, chunk_volume())
}

/// Convert a world-space voxel coordinate to its containing chunk coordinate.
pub fn world_to_chunk(world: WorldCoord) -> ChunkCoord {
    let cs = CHUNK_SIZE as i32;
    IVec3::new(
        world.x.div_euclid(cs),
        world.y.div_euclid(cs),
        world.z.div_euclid(cs),
    )
}

/// Convert a world-space voxel coordinate to its local offset within a chunk.
pub fn world_to_local(world: WorldCoord) -> UVec3 {
    let cs = CHUNK_SIZE as i32;
    IVec3::new(
        world.x.rem_euclid(cs),
        world.y.rem_euclid(cs),
        world.z.rem_euclid(cs),
    )
    .as_uvec3()
}

/// Convert a chunk coordinate and local offset back to world-space.
pub fn chunk_local_to_world(chunk: ChunkCoord, local: UVec3) -> WorldCoord {
    chunk * CHUNK_SIZE as i32 + local.as_ivec3()
}

/// Check if a world voxel coordinate lies inside the addressable world.
pub fn in_world_bounds(world: WorldCoord) -> bool {
    let size = WORLD_SIZE as i32;
    world.cmpge(IVec3::ZERO).all() && world.cmplt(IVec3::splat(size)).all()
}

/// World-space origin of a chunk.
pub fn chunk_world_position(index: u32) -> Vec3 {
    (chunk_coord(index) * CHUNK_SIZE as i32).as_vec3()
}

/// Chunk index containing a continuous world position (e.g. the observer).
pub fn position_chunk_index(position: Vec3) -> Option<u32> {
    let coord = (position / CHUNK_SIZE as f32).floor().as_ivec3();
    chunk_index(coord)
}

/// Catalog slot holding one LOD of a chunk.
pub fn catalog_slot(chunk_index: u32, lod: LodLevel) -> u32 {
    chunk_index * LOD_SLOTS_PER_CHUNK + lod.slot_offset()
}

/// Pack voxel fields into the two-u32 representation.
pub fn pack_voxel(
    local: UVec3,
    color: u8,
    chunk_slot: u32,
    faces: FaceMask,
    orientation: Orientation,
) -> VoxelRecord {
    // low word: x[0:6] | y[7:13] | z[14:20] | color[21:28] | orientation[29]
    let low = (local.x & POS_MASK)
        | ((local.y & POS_MASK) << 7)
        | ((local.z & POS_MASK) << 14)
        | ((color as u32) << 21)
        | ((orientation as u32) << 29);

    // high word: slot[0:19] | faces[20:25]
    let high = (chunk_slot & SLOT_MASK) | (((faces.0 as u32) & FACE_MASK_BITS) << 20);

    VoxelRecord { low, high }
}

/// Unpack voxel fields from the two-u32 representation.
///
/// Returns (local position, color index, chunk slot, face mask, orientation).
pub fn unpack_voxel(voxel: VoxelRecord) -> (UVec3, u8, u32, FaceMask, Orientation) {
    let local = UVec3::new(
        voxel.low & POS_MASK,
        (voxel.low >> 7) & POS_MASK,
        (voxel.low >> 14) & POS_MASK,
    );
    let color = ((voxel.low >> 21) & COLOR_MASK) as u8;
    let orientation = if (voxel.low >> 29) & 1 == 1 {
        Orientation::TopQuad
    } else {
        Orientation::Cube
    };
    let slot = voxel.high & SLOT_MASK;
    let faces = FaceMask(((voxel.high >> 20) & FACE_MASK_BITS) as u8);

    (local, color, slot, faces, orientation)
}

impl VoxelRecord {
    pub fn local_position(self) -> UVec3 {
        unpack_voxel(self).0
    }

    pub fn color(self) -> u8 {
        unpack_voxel(self).1
    }

    pub fn chunk_slot(self) -> u32 {
        unpack_voxel(self).2
    }

    pub fn faces(self) -> FaceMask {
        unpack_voxel(self).3
    }

    pub fn orientation(self) -> Orientation {
        unpack_voxel(self).4
    }
}
