use glam::{IVec3, Vec3};
use voxvfx_core::config::{clamp_lod_distances, RuntimeConfig};
use voxvfx_core::constants::{MATERIAL_SLOTS, WORLD_SIZE};
use voxvfx_core::material::{default_material_table, opacity_mask, MaterialTable};
use voxvfx_core::types::{ChunkRecord, VoxelRecord};
use voxvfx_world::WorldData;

use crate::assembler::{assemble, upload_chunks, upload_materials, upload_voxels};
use crate::backend::{AccelerationStructure, RenderBackend, DEBUG_LOD, EXPOSURE_WEIGHT};
use crate::catalog::ChunkCatalog;
use crate::error::BackendError;
use crate::loader::build_catalog;
use crate::path_tracing::PathTracer;
use crate::selector::{select_visible, Observer, RefreshTrigger};

/// Application context for a loaded voxel world.
///
/// Owns the chunk catalog and pushes the visible slice of it to a
/// [`RenderBackend`] whenever the refresh trigger fires.
pub struct VoxRuntime<B: RenderBackend> {
    backend: B,
    accel: Option<Box<dyn AccelerationStructure>>,
    config: RuntimeConfig,
    catalog: ChunkCatalog,
    materials: MaterialTable,
    opacity: [bool; MATERIAL_SLOTS],
    trigger: RefreshTrigger,
    path_tracer: PathTracer,
    active: Vec<u32>,
    bounds: Option<(IVec3, IVec3)>,
    last_observer: Option<Observer>,
}

impl<B: RenderBackend> VoxRuntime<B> {
    pub fn new(backend: B, config: RuntimeConfig) -> Self {
        let materials = default_material_table();
        Self {
            backend,
            accel: None,
            config,
            catalog: ChunkCatalog::new(),
            opacity: opacity_mask(&materials),
            materials,
            trigger: RefreshTrigger::new(),
            path_tracer: PathTracer::new(),
            active: Vec::new(),
            bounds: None,
            last_observer: None,
        }
    }

    pub fn with_acceleration_structure(mut self, accel: Box<dyn AccelerationStructure>) -> Self {
        self.accel = Some(accel);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ChunkCatalog {
        &self.catalog
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    /// Slots made active by the last refresh, ascending.
    pub fn active_slots(&self) -> &[u32] {
        &self.active
    }

    pub fn set_materials(&mut self, materials: MaterialTable) -> Result<(), BackendError> {
        self.opacity = opacity_mask(&materials);
        self.materials = materials;
        upload_materials(&mut self.backend, &self.materials)?;
        self.trigger.force();
        Ok(())
    }

    /// Register the packed voxels of one catalog slot.
    pub fn set_voxel_chunk(
        &mut self,
        slot: u32,
        payload: Vec<VoxelRecord>,
    ) -> Result<(), BackendError> {
        self.catalog.set_payload(slot, payload)?;
        self.trigger.force();
        Ok(())
    }

    /// Register the full record array. It must cover every catalog slot.
    pub fn set_chunks(&mut self, records: Vec<ChunkRecord>) -> Result<(), BackendError> {
        self.catalog.set_records(records)?;
        upload_chunks(&mut self.backend, self.catalog.records())?;
        self.trigger.force();
        Ok(())
    }

    /// Replace the whole catalog. Instances of the previous catalog are
    /// dropped from the acceleration structure.
    pub fn load_catalog(&mut self, catalog: ChunkCatalog) -> Result<(), BackendError> {
        if let Some(accel) = self.accel.as_deref_mut() {
            self.path_tracer.clear(accel);
        }
        self.catalog = catalog;
        self.active.clear();
        upload_chunks(&mut self.backend, self.catalog.records())?;
        self.trigger.force();
        log::info!(
            "catalog loaded: {} slots, {} voxels",
            self.catalog.loaded_slots(),
            self.catalog.total_voxels()
        );
        Ok(())
    }

    /// Compute LODs for an imported world and load the result.
    pub fn load_world(&mut self, world: &WorldData) -> Result<(), BackendError> {
        self.set_materials(*world.materials())?;
        self.set_world_bounds(world.bounds());
        self.load_catalog(build_catalog(world))
    }

    pub fn set_world_bounds(&mut self, bounds: Option<(IVec3, IVec3)>) {
        self.bounds = bounds;
    }

    /// Where to place a new observer: the centre of the world bounds, or the
    /// centre of the addressable world when nothing is loaded.
    pub fn spawn_position(&self) -> Vec3 {
        match self.bounds {
            Some((min, max)) => (min.as_vec3() + max.as_vec3()) * 0.5,
            None => Vec3::splat(WORLD_SIZE as f32 * 0.5),
        }
    }

    pub fn force_refresh(&mut self) {
        self.trigger.force();
    }

    /// Per-frame entry point. Returns whether a refresh ran.
    pub fn update(&mut self, observer: &Observer, dt: f32) -> Result<bool, BackendError> {
        if !self.trigger.update(observer, dt, &self.config) {
            return Ok(false);
        }
        self.refresh(observer)?;
        Ok(true)
    }

    /// Re-select visible slots and push them to the backend.
    pub fn refresh(&mut self, observer: &Observer) -> Result<(), BackendError> {
        self.last_observer = Some(*observer);
        self.active = select_visible(self.catalog.records_mut(), observer, &self.config);
        upload_chunks(&mut self.backend, self.catalog.records())?;

        let voxels = assemble(&self.catalog, &self.active);
        if voxels.is_empty() {
            log::debug!("no visible voxels, keeping previous voxel buffer");
        } else {
            upload_voxels(&mut self.backend, &voxels, &self.config)?;
        }

        if self.config.path_tracing {
            if let Some(accel) = self.accel.as_deref_mut() {
                self.path_tracer.sync(
                    accel,
                    &self.catalog,
                    &self.active,
                    &self.opacity,
                    observer.position,
                )?;
            }
        }
        Ok(())
    }

    /// Change the LOD thresholds and re-select right away. Returned strings
    /// describe any clamping.
    pub fn set_lod_distances(&mut self, lod0: f32, lod1: f32) -> Result<Vec<String>, BackendError> {
        let (clamped0, clamped1) = clamp_lod_distances(lod0, lod1);
        let mut warnings = Vec::new();
        if clamped0 != lod0 {
            warnings.push(format!("lod0_distance {lod0} raised to {clamped0}"));
        }
        if clamped1 != lod1 {
            warnings.push(format!("lod1_distance {lod1} raised to {clamped1}"));
        }
        for warning in &warnings {
            log::warn!("{warning}");
        }
        self.config.lod0_distance = clamped0;
        self.config.lod1_distance = clamped1;

        match self.last_observer {
            Some(observer) => self.refresh(&observer)?,
            None => self.trigger.force(),
        }
        Ok(warnings)
    }

    pub fn set_path_tracing(&mut self, enabled: bool) {
        if self.config.path_tracing == enabled {
            return;
        }
        self.config.path_tracing = enabled;
        if !enabled {
            if let Some(accel) = self.accel.as_deref_mut() {
                self.path_tracer.clear(accel);
            }
        }
        self.trigger.force();
    }

    /// Rebuild every instance from the current active set. Rejected with a
    /// logged error unless path tracing is on.
    pub fn rebuild_acceleration_structure(&mut self) -> Result<(), BackendError> {
        if !self.config.path_tracing {
            log::error!("Can't render without path tracing enabled!");
            return Ok(());
        }
        let Some(accel) = self.accel.as_deref_mut() else {
            log::error!("no acceleration structure attached");
            return Ok(());
        };
        self.path_tracer.clear(accel);
        let origin = self.last_observer.map_or(Vec3::ZERO, |o| o.position);
        self.path_tracer
            .sync(accel, &self.catalog, &self.active, &self.opacity, origin)?;
        Ok(())
    }

    pub fn set_debug_lod(&mut self, enabled: bool) {
        self.config.debug_lod = enabled;
        self.backend.set_bool(DEBUG_LOD, enabled);
        self.backend.play();
    }

    pub fn set_exposure_weight(&mut self, weight: f32) {
        self.config.exposure_weight = weight;
        self.backend.set_float(EXPOSURE_WEIGHT, weight);
        self.backend.play();
    }

    /// Release backend buffers and acceleration structure instances.
    pub fn release(&mut self) {
        if let Some(accel) = self.accel.as_deref_mut() {
            self.path_tracer.clear(accel);
        }
        self.backend.release();
        self.active.clear();
    }
}
