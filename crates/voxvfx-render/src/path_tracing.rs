use std::collections::{BTreeMap, HashMap, HashSet};

use glam::{Mat4, Quat, Vec3};
use rayon::prelude::*;
use voxvfx_core::constants::{MATERIAL_SLOTS, MAX_INSTANCES_PER_CALL};
use voxvfx_core::direction::Face;
use voxvfx_core::types::{ChunkRecord, VoxelRecord};

use crate::backend::{AccelerationStructure, InstanceHandle, InstanceMesh};
use crate::catalog::ChunkCatalog;
use crate::error::BackendError;

/// Instance transforms of one slot, grouped by material.
pub type MaterialInstances = BTreeMap<u8, Vec<Mat4>>;

/// Orientation of the quad drawn for a visible face.
pub fn face_rotation(face: Face) -> Quat {
    match face {
        Face::Top => Quat::from_rotation_x(90f32.to_radians()),
        Face::Right => Quat::from_rotation_y(-90f32.to_radians()),
        Face::Bottom => Quat::from_rotation_x(270f32.to_radians()),
        Face::Left => Quat::from_rotation_y(90f32.to_radians()),
        Face::Front => Quat::from_rotation_y(180f32.to_radians()),
        Face::Back => Quat::IDENTITY,
    }
}

pub fn mesh_for(opaque: bool) -> InstanceMesh {
    if opaque {
        InstanceMesh::Cube
    } else {
        InstanceMesh::Quad
    }
}

/// Transforms for one voxel: a single cube scaled by the LOD step when the
/// material is opaque, otherwise one quad per visible face pushed half a
/// voxel out along the face.
///
/// The packed orientation is read only by the instancing shader. Ray traced
/// geometry comes from the opacity and the face mask alone.
pub fn voxel_transforms(voxel: VoxelRecord, record: &ChunkRecord, opaque: bool, out: &mut Vec<Mat4>) {
    let scale = record.lod_level as f32;
    let position = record.world_position() + voxel.local_position().as_vec3();
    if opaque {
        out.push(Mat4::from_scale_rotation_translation(
            Vec3::splat(scale),
            Quat::IDENTITY,
            position,
        ));
        return;
    }
    let offset = 0.5 * scale;
    for face in voxel.faces().faces() {
        out.push(Mat4::from_scale_rotation_translation(
            Vec3::splat(scale),
            face_rotation(face),
            position + face.normal() * offset,
        ));
    }
}

pub fn expand_slot(
    payload: &[VoxelRecord],
    record: &ChunkRecord,
    opacity: &[bool; MATERIAL_SLOTS],
) -> MaterialInstances {
    let mut out = MaterialInstances::new();
    for &voxel in payload {
        let color = voxel.color();
        voxel_transforms(
            voxel,
            record,
            opacity[color as usize],
            out.entry(color).or_default(),
        );
    }
    out.retain(|_, transforms| !transforms.is_empty());
    out
}

/// Split an instance list into batches no larger than `max_per_call`.
pub fn split_instances<T>(items: &[T], max_per_call: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(max_per_call.max(1))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub added_slots: usize,
    pub removed_slots: usize,
    pub add_calls: usize,
}

/// Keeps the acceleration structure in step with the active slot set.
///
/// Only slots that changed state are touched: newly active slots get their
/// instances added and newly inactive slots have theirs removed.
pub struct PathTracer {
    handles: HashMap<u32, Vec<InstanceHandle>>,
    max_per_call: usize,
}

impl Default for PathTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTracer {
    pub fn new() -> Self {
        Self::with_max_per_call(MAX_INSTANCES_PER_CALL)
    }

    pub fn with_max_per_call(max_per_call: usize) -> Self {
        Self {
            handles: HashMap::new(),
            max_per_call,
        }
    }

    pub fn tracked_slots(&self) -> usize {
        self.handles.len()
    }

    pub fn sync(
        &mut self,
        accel: &mut dyn AccelerationStructure,
        catalog: &ChunkCatalog,
        active: &[u32],
        opacity: &[bool; MATERIAL_SLOTS],
        origin: Vec3,
    ) -> Result<SyncStats, BackendError> {
        let mut stats = SyncStats::default();
        let active_set: HashSet<u32> = active.iter().copied().collect();

        let stale: Vec<u32> = self
            .handles
            .keys()
            .filter(|slot| !active_set.contains(*slot))
            .copied()
            .collect();
        for slot in stale {
            if let Some(handles) = self.handles.remove(&slot) {
                for handle in handles {
                    accel.remove_instances(handle);
                }
                stats.removed_slots += 1;
            }
        }

        let added: Vec<u32> = active
            .iter()
            .copied()
            .filter(|slot| !self.handles.contains_key(slot))
            .collect();
        let expanded: Vec<(u32, MaterialInstances)> = added
            .par_iter()
            .filter_map(|&slot| {
                let record = catalog.record(slot)?;
                Some((slot, expand_slot(catalog.payload(slot), record, opacity)))
            })
            .collect();

        for (slot, per_material) in expanded {
            let handles = self.handles.entry(slot).or_default();
            for (material, transforms) in per_material {
                let mesh = mesh_for(opacity[material as usize]);
                for batch in split_instances(&transforms, self.max_per_call) {
                    handles.push(accel.add_instances(material, mesh, batch)?);
                    stats.add_calls += 1;
                }
            }
            stats.added_slots += 1;
        }

        accel.build(origin);
        log::debug!(
            "acceleration structure: +{} -{} slots, {} add calls",
            stats.added_slots,
            stats.removed_slots,
            stats.add_calls
        );
        Ok(stats)
    }

    /// Drop every tracked instance.
    pub fn clear(&mut self, accel: &mut dyn AccelerationStructure) {
        for (_, handles) in self.handles.drain() {
            for handle in handles {
                accel.remove_instances(handle);
            }
        }
        accel.clear();
    }
}
