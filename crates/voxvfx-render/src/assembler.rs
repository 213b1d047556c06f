use rayon::prelude::*;
use voxvfx_core::config::RuntimeConfig;
use voxvfx_core::constants::{MAX_CAPACITY, STEP_CAPACITY};
use voxvfx_core::material::{MaterialRecord, MaterialTable};
use voxvfx_core::types::{ChunkRecord, VoxelRecord};

use crate::backend::{
    BufferBinding, RenderBackend, DEBUG_LOD, EXPOSURE_WEIGHT, INITIAL_BURST_COUNT,
};
use crate::catalog::ChunkCatalog;
use crate::error::BackendError;

/// Concatenate the payloads of `active` slots in the given order. Each
/// slot's voxels stay contiguous.
pub fn assemble(catalog: &ChunkCatalog, active: &[u32]) -> Vec<VoxelRecord> {
    active
        .par_iter()
        .flat_map_iter(|&slot| catalog.payload(slot).iter().copied())
        .collect()
}

/// Instance capacity tier for `count` voxels: the next multiple of
/// [`STEP_CAPACITY`] above the count, capped at [`MAX_CAPACITY`].
pub fn capacity_tier(count: usize) -> u32 {
    let tier = (count as u64 / STEP_CAPACITY as u64 + 1) * STEP_CAPACITY as u64;
    tier.min(MAX_CAPACITY as u64) as u32
}

pub fn upload_materials(
    backend: &mut dyn RenderBackend,
    materials: &MaterialTable,
) -> Result<(), BackendError> {
    backend.set_structured_buffer(
        BufferBinding::Materials,
        bytemuck::cast_slice(&materials[..]),
        std::mem::size_of::<MaterialRecord>(),
    )
}

pub fn upload_chunks(
    backend: &mut dyn RenderBackend,
    records: &[ChunkRecord],
) -> Result<(), BackendError> {
    backend.set_structured_buffer(
        BufferBinding::Chunks,
        bytemuck::cast_slice(records),
        std::mem::size_of::<ChunkRecord>(),
    )
}

/// Upload an assembled voxel buffer and trigger a redraw.
pub fn upload_voxels(
    backend: &mut dyn RenderBackend,
    voxels: &[VoxelRecord],
    config: &RuntimeConfig,
) -> Result<(), BackendError> {
    if voxels.len() > MAX_CAPACITY as usize {
        log::warn!(
            "{} voxels exceed the largest capacity tier ({MAX_CAPACITY})",
            voxels.len()
        );
    }
    let capacity = capacity_tier(voxels.len());
    log::debug!("uploading {} voxels (capacity {capacity})", voxels.len());

    backend.set_capacity(capacity);
    backend.set_structured_buffer(
        BufferBinding::Voxels,
        bytemuck::cast_slice(voxels),
        std::mem::size_of::<VoxelRecord>(),
    )?;
    backend.set_int(INITIAL_BURST_COUNT, voxels.len() as i32);
    backend.set_float(EXPOSURE_WEIGHT, config.exposure_weight);
    backend.set_bool(DEBUG_LOD, config.debug_lod);
    backend.play();
    Ok(())
}
