use std::collections::HashMap;

use glam::{IVec3, UVec3, Vec3};
use voxvfx_core::constants::WORLD_CHUNK_COUNT;
use voxvfx_core::material::{default_material_table, MaterialTable};
use voxvfx_core::math::{
    chunk_index, in_world_bounds, local_index, world_to_chunk, world_to_local,
};
use voxvfx_core::types::WorldCoord;

/// One imported voxel: position inside its chunk and palette color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawVoxel {
    pub local: [u8; 3],
    pub color: u8,
}

impl RawVoxel {
    pub fn new(local: UVec3, color: u8) -> Self {
        Self {
            local: [local.x as u8, local.y as u8, local.z as u8],
            color,
        }
    }

    pub fn position(&self) -> UVec3 {
        UVec3::new(
            self.local[0] as u32,
            self.local[1] as u32,
            self.local[2] as u32,
        )
    }
}

/// Voxels of one chunk keyed by local index.
pub type ChunkCells = HashMap<u32, RawVoxel>;

/// Sparse world of chunks filled by the flattener.
///
/// Slots are allocated on the first write into a chunk. Writes to an
/// occupied position replace the previous voxel.
pub struct WorldData {
    chunks: Vec<Option<ChunkCells>>,
    materials: MaterialTable,
    bounds: Option<(IVec3, IVec3)>,
    voxel_count: usize,
    dropped: usize,
}

impl std::fmt::Debug for WorldData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldData")
            .field("voxel_count", &self.voxel_count())
            .field("dropped", &self.dropped_count())
            .field("bounds", &self.bounds())
            .finish()
    }
}

impl Default for WorldData {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldData {
    pub fn new() -> Self {
        Self {
            chunks: (0..WORLD_CHUNK_COUNT).map(|_| None).collect(),
            materials: default_material_table(),
            bounds: None,
            voxel_count: 0,
            dropped: 0,
        }
    }

    /// Store a voxel at a world coordinate. Returns false (and counts the
    /// voxel as dropped) when the coordinate is outside the world.
    pub fn insert(&mut self, world: WorldCoord, color: u8) -> bool {
        if !in_world_bounds(world) {
            self.dropped += 1;
            return false;
        }
        let Some(index) = chunk_index(world_to_chunk(world)) else {
            self.dropped += 1;
            return false;
        };
        let local = world_to_local(world);
        let cells = self.chunks[index as usize].get_or_insert_with(HashMap::new);
        if cells
            .insert(local_index(local), RawVoxel::new(local, color))
            .is_none()
        {
            self.voxel_count += 1;
        }
        self.bounds = Some(match self.bounds {
            Some((min, max)) => (min.min(world), max.max(world)),
            None => (world, world),
        });
        true
    }

    pub fn insert_all(&mut self, voxels: impl IntoIterator<Item = (WorldCoord, u8)>) {
        for (world, color) in voxels {
            self.insert(world, color);
        }
    }

    pub fn chunk(&self, index: u32) -> Option<&ChunkCells> {
        self.chunks.get(index as usize).and_then(Option::as_ref)
    }

    /// Indices of every chunk holding at least one voxel, ascending.
    pub fn occupied_chunks(&self) -> Vec<u32> {
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_ref().is_some_and(|cells| !cells.is_empty()))
            .map(|(i, _)| i as u32)
            .collect()
    }

    pub fn voxel_at(&self, world: WorldCoord) -> Option<RawVoxel> {
        let index = chunk_index(world_to_chunk(world))?;
        self.chunk(index)?
            .get(&local_index(world_to_local(world)))
            .copied()
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn set_materials(&mut self, materials: MaterialTable) {
        self.materials = materials;
    }

    /// Inclusive min/max of all stored voxel coordinates.
    pub fn bounds(&self) -> Option<(IVec3, IVec3)> {
        self.bounds
    }

    /// Center of the occupied bounds, or the world center when empty.
    pub fn center(&self) -> Vec3 {
        match self.bounds {
            Some((min, max)) => (min.as_vec3() + max.as_vec3() + Vec3::ONE) * 0.5,
            None => Vec3::splat(voxvfx_core::constants::WORLD_SIZE as f32 * 0.5),
        }
    }

    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    /// Voxels rejected for landing outside the world.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count == 0
    }
}
