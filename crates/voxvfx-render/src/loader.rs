use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use voxvfx_core::math::{catalog_slot, pack_voxel};
use voxvfx_core::types::{ChunkRecord, VoxelRecord};
use voxvfx_world::{compute_world_lods, ChunkLod, LodSink, WorldData};

use crate::catalog::ChunkCatalog;

/// Pack one LOD level into catalog form: the slot's record and its voxels,
/// each carrying the slot as its chunk back-reference.
pub fn pack_chunk_lod(lod: &ChunkLod) -> (u32, ChunkRecord, Vec<VoxelRecord>) {
    let slot = catalog_slot(lod.chunk_index, lod.lod);
    let voxels: Vec<VoxelRecord> = lod
        .voxels
        .iter()
        .map(|v| pack_voxel(v.local, v.color, slot, v.faces, v.orientation))
        .collect();
    let record = ChunkRecord::new(
        lod.chunk_index,
        lod.lod,
        lod.world_position,
        voxels.len() as u32,
    );
    (slot, record, voxels)
}

/// [`LodSink`] that fills a [`ChunkCatalog`] as chunks complete.
pub struct CatalogBuilder {
    catalog: Mutex<ChunkCatalog>,
    progress: Mutex<f32>,
    finished: AtomicBool,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            catalog: Mutex::new(ChunkCatalog::new()),
            progress: Mutex::new(0.0),
            finished: AtomicBool::new(false),
        }
    }

    pub fn progress(&self) -> f32 {
        match self.progress.lock() {
            Ok(p) => *p,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn into_catalog(self) -> ChunkCatalog {
        match self.catalog.into_inner() {
            Ok(catalog) => catalog,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl LodSink for CatalogBuilder {
    fn on_chunk_lod(&self, lod: ChunkLod) {
        let (slot, record, voxels) = pack_chunk_lod(&lod);
        let mut catalog = match self.catalog.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = catalog
            .set_record(slot, record)
            .and_then(|_| catalog.set_payload(slot, voxels))
        {
            log::error!("dropping LOD for chunk {}: {e}", lod.chunk_index);
        }
    }

    fn on_progress(&self, fraction: f32) {
        let mut progress = match self.progress.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *progress = progress.max(fraction);
    }

    fn on_finished(&self) {
        self.finished.store(true, Ordering::Release);
        log::info!("all chunk LODs computed");
    }
}

/// Compute every chunk LOD of `world` and collect the results.
pub fn build_catalog(world: &WorldData) -> ChunkCatalog {
    let builder = CatalogBuilder::new();
    compute_world_lods(world, &builder);
    builder.into_catalog()
}
