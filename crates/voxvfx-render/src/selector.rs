use glam::{Mat4, Quat, Vec3};
use rayon::prelude::*;
use voxvfx_core::config::RuntimeConfig;
use voxvfx_core::constants::CHUNK_SIZE;
use voxvfx_core::frustum::{Aabb, Frustum};
use voxvfx_core::math::position_chunk_index;
use voxvfx_core::types::ChunkRecord;

/// Camera state the selector needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub position: Vec3,
    pub rotation: Quat,
    pub frustum: Frustum,
}

impl Observer {
    /// Build a perspective observer looking along its rotated -Z axis.
    pub fn perspective(position: Vec3, rotation: Quat, fov_y: f32, aspect: f32, far: f32) -> Self {
        let view = Mat4::from_rotation_translation(rotation, position).inverse();
        let proj = Mat4::perspective_rh(fov_y, aspect, 0.1, far);
        Self {
            position,
            rotation,
            frustum: Frustum::from_view_projection(proj * view),
        }
    }

    pub fn chunk_index(&self) -> Option<u32> {
        position_chunk_index(self.position)
    }
}

/// Whether a catalog slot should be drawn for this observer.
///
/// Empty slots never qualify. A populated slot qualifies only when its
/// stored LOD is the band its distance falls into.
pub fn is_slot_visible(record: &ChunkRecord, observer: &Observer, config: &RuntimeConfig) -> bool {
    let Some(lod) = record.lod() else {
        return false;
    };
    let center = record.center();
    let aabb = Aabb {
        center,
        extents: Vec3::splat(CHUNK_SIZE as f32 * 0.5),
    };
    if !observer.frustum.intersects_aabb(&aabb) {
        return false;
    }
    let distance = observer.position.distance(center);
    distance < config.render_distance && config.band_for_distance(distance) == lod
}

/// Re-evaluate every slot's active flag and return the active slots in
/// ascending order.
///
/// The per-slot test runs in parallel; flags are written back afterwards on
/// the calling thread.
pub fn select_visible(
    records: &mut [ChunkRecord],
    observer: &Observer,
    config: &RuntimeConfig,
) -> Vec<u32> {
    let flags: Vec<bool> = records
        .par_iter()
        .map(|record| is_slot_visible(record, observer, config))
        .collect();

    let mut active = Vec::new();
    for (slot, (record, visible)) in records.iter_mut().zip(flags).enumerate() {
        record.set_active(visible);
        if visible {
            active.push(slot as u32);
        }
    }
    active
}

/// Decides when the selector has to run again.
///
/// Fires when the observer enters another chunk, when it has turned past
/// the rotation threshold and the debounce timer has elapsed, or when a
/// refresh was forced.
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    previous_chunk: Option<u32>,
    previous_rotation: Quat,
    timer: f32,
    forced: bool,
}

impl Default for RefreshTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self {
            previous_chunk: None,
            previous_rotation: Quat::IDENTITY,
            timer: 0.0,
            forced: true,
        }
    }

    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn update(&mut self, observer: &Observer, dt: f32, config: &RuntimeConfig) -> bool {
        self.timer += dt;
        let chunk = observer.chunk_index();
        let angle = observer
            .rotation
            .angle_between(self.previous_rotation)
            .to_degrees();
        let other_chunk = chunk != self.previous_chunk;
        let turned =
            angle > config.min_rotation_degrees && self.timer >= config.refresh_debounce_secs;

        if !(other_chunk || turned || self.forced) {
            return false;
        }
        self.timer = 0.0;
        self.forced = false;
        if other_chunk {
            self.previous_chunk = chunk;
        } else {
            self.previous_rotation = observer.rotation;
        }
        true
    }
}
