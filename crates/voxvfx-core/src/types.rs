use glam::{IVec3, Vec3};

use crate::constants::{CHUNK_SIZE, LOD_SLOTS_PER_CHUNK};

/// Chunk coordinate in chunk-space (each unit = CHUNK_SIZE world units).
pub type ChunkCoord = IVec3;

/// World coordinate in voxel-space.
pub type WorldCoord = IVec3;

/// Precomputed detail level of a chunk. The discriminant is the voxel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum LodLevel {
    Full = 1,
    Half = 2,
    Quarter = 4,
}

impl LodLevel {
    pub const ALL: [LodLevel; 3] = [LodLevel::Full, LodLevel::Half, LodLevel::Quarter];

    /// Voxel step (and instance scale) of this level.
    pub fn step(self) -> u32 {
        self as u32
    }

    /// Offset of this level inside a chunk's block of catalog slots.
    pub fn slot_offset(self) -> u32 {
        match self {
            LodLevel::Full => 0,
            LodLevel::Half => 1,
            LodLevel::Quarter => 2,
        }
    }

    pub fn from_step(step: u32) -> Option<LodLevel> {
        match step {
            1 => Some(LodLevel::Full),
            2 => Some(LodLevel::Half),
            4 => Some(LodLevel::Quarter),
            _ => None,
        }
    }
}

/// How the instancing stage draws a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Orientation {
    /// Full cube at the voxel center.
    #[default]
    Cube = 0,
    /// Single quad pivoted by half a voxel and rotated 90° about X.
    TopQuad = 1,
}

/// Packed voxel instance: 8 bytes stored as two u32 values.
///
/// Bit layout:
///   low  [0:6]    local x (0..CHUNK_SIZE)
///   low  [7:13]   local y
///   low  [14:20]  local z
///   low  [21:28]  color index
///   low  [29]     orientation variant
///   high [0:19]   chunk catalog slot
///   high [20:25]  visible face mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct VoxelRecord {
    pub low: u32,
    pub high: u32,
}

/// Per-slot chunk metadata uploaded alongside the voxel buffer.
///
/// A zeroed record (lod_level 0) is an empty slot and never matches a
/// distance band.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ChunkRecord {
    pub chunk_index: u32,
    pub lod_level: u32,
    pub is_active: u32,
    pub length: u32,
    pub world_position: [f32; 4],
    pub center: [f32; 4],
}

impl ChunkRecord {
    /// Build a populated record for one precomputed LOD of a chunk.
    pub fn new(chunk_index: u32, lod: LodLevel, world_position: Vec3, length: u32) -> Self {
        let half = CHUNK_SIZE as f32 * 0.5;
        let center = world_position + Vec3::splat(half);
        Self {
            chunk_index,
            lod_level: lod as u32,
            is_active: 0,
            length,
            world_position: world_position.extend(1.0).to_array(),
            center: center.extend(1.0).to_array(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lod_level == 0
    }

    pub fn is_active(&self) -> bool {
        self.is_active != 0
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active as u32;
    }

    pub fn lod(&self) -> Option<LodLevel> {
        LodLevel::from_step(self.lod_level)
    }

    pub fn center(&self) -> Vec3 {
        Vec3::from_slice(&self.center[..3])
    }

    pub fn world_position(&self) -> Vec3 {
        Vec3::from_slice(&self.world_position[..3])
    }

    /// Catalog slot this record occupies.
    pub fn slot(&self) -> Option<u32> {
        self.lod()
            .map(|lod| self.chunk_index * LOD_SLOTS_PER_CHUNK + lod.slot_offset())
    }
}
