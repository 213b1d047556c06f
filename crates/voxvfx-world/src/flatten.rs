use std::collections::HashMap;

use glam::{IVec3, Mat4, Vec3};
use rayon::prelude::*;
use voxvfx_core::constants::WORLD_ORIGIN_OFFSET;
use voxvfx_core::types::WorldCoord;
use voxvfx_vox::model::{GroupNode, ShapeNode, TransformNode};
use voxvfx_vox::{VoxScene, VoxelGrid};

use crate::error::FlattenError;
use crate::visibility::surface_voxels;
use crate::world_data::WorldData;

/// Hooks into model placement, mainly for tracking buffer lifetimes.
pub trait FlattenObserver {
    fn on_model_placed(&mut self, _model_id: usize) {}
    /// Called once, right after the last placement of a model.
    fn on_model_released(&mut self, _model_id: usize) {}
}

pub struct NoopObserver;

impl FlattenObserver for NoopObserver {}

/// World coordinates of every surface voxel of `grid` placed by `matrix`.
///
/// Each voxel center is taken relative to the model pivot, transformed,
/// floored, and shifted by the world origin offset.
pub fn place_model(grid: &VoxelGrid, matrix: Mat4) -> Vec<(WorldCoord, u8)> {
    let pivot = grid.pivot();
    let offset = IVec3::splat(WORLD_ORIGIN_OFFSET);
    surface_voxels(grid)
        .into_par_iter()
        .map(|(pos, color)| {
            let center = pos.as_vec3() + Vec3::splat(0.5) - pivot;
            // Float to int casts saturate; the add must too.
            let world = matrix
                .transform_point3(center)
                .floor()
                .as_ivec3()
                .saturating_add(offset);
            (world, color)
        })
        .collect()
}

/// Incremental scene graph walk that writes placed voxels into a [`WorldData`].
///
/// Transform nodes are visited in file order, one per [`step`](Self::step).
/// Model buffers are reference counted by placement and dropped after their
/// final use.
pub struct SceneFlattener {
    models: Vec<Option<VoxelGrid>>,
    remaining: Vec<usize>,
    transforms: Vec<TransformNode>,
    groups: HashMap<i32, GroupNode>,
    shapes: HashMap<i32, ShapeNode>,
    matrices: HashMap<i32, Mat4>,
    next: usize,
    legacy: bool,
    world: WorldData,
}

impl SceneFlattener {
    pub fn new(scene: VoxScene) -> Self {
        let legacy = !scene.has_scene_graph();
        let mut remaining = vec![0usize; scene.models.len()];
        if legacy {
            remaining.iter_mut().for_each(|r| *r = 1);
        } else {
            for t in &scene.transforms {
                if let Some(shape) = scene.shapes.get(&t.child_id) {
                    for m in &shape.models {
                        if let Some(r) = usize::try_from(m.model_id)
                            .ok()
                            .and_then(|id| remaining.get_mut(id))
                        {
                            *r += 1;
                        }
                    }
                }
            }
        }

        Self {
            models: scene.models.into_iter().map(Some).collect(),
            remaining,
            transforms: scene.transforms,
            groups: scene.groups,
            shapes: scene.shapes,
            matrices: HashMap::new(),
            next: 0,
            legacy,
            world: WorldData::new(),
        }
    }

    fn total_steps(&self) -> usize {
        if self.legacy {
            self.models.len()
        } else {
            self.transforms.len()
        }
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.total_steps()
    }

    pub fn progress(&self) -> f32 {
        let total = self.total_steps();
        if total == 0 {
            1.0
        } else {
            self.next as f32 / total as f32
        }
    }

    /// Process one transform node (or one model for files without a scene
    /// graph). Returns false once everything has been placed.
    pub fn step(&mut self, observer: &mut dyn FlattenObserver) -> Result<bool, FlattenError> {
        if self.is_done() {
            return Ok(false);
        }
        let index = self.next;
        self.next += 1;

        if self.legacy {
            self.place(index, Mat4::IDENTITY, observer)?;
            return Ok(!self.is_done());
        }

        let (id, child_id, own) = {
            let t = &self.transforms[index];
            (t.id, t.child_id, t.matrix())
        };
        let matrix = match self.matrices.get(&id) {
            Some(parent) => *parent * own,
            None => own,
        };
        self.matrices.insert(id, matrix);

        if let Some(group) = self.groups.get(&child_id) {
            for child in &group.children {
                self.matrices.insert(*child, matrix);
            }
        } else if let Some(shape) = self.shapes.get(&child_id) {
            let shape_id = shape.id;
            let model_ids: Vec<i32> = shape.models.iter().map(|m| m.model_id).collect();
            for model_id in model_ids {
                let index = usize::try_from(model_id)
                    .ok()
                    .filter(|i| *i < self.models.len())
                    .ok_or(FlattenError::MissingModel {
                        shape: shape_id,
                        model_id,
                    })?;
                self.place(index, matrix, observer)?;
            }
        } else {
            return Err(FlattenError::MissingNode {
                transform: id,
                child: child_id,
            });
        }

        Ok(!self.is_done())
    }

    fn place(
        &mut self,
        model_id: usize,
        matrix: Mat4,
        observer: &mut dyn FlattenObserver,
    ) -> Result<(), FlattenError> {
        let grid = self.models[model_id]
            .as_ref()
            .ok_or(FlattenError::ModelReleased(model_id))?;
        let placed = place_model(grid, matrix);
        let before = self.world.dropped_count();
        self.world.insert_all(placed);
        let dropped = self.world.dropped_count() - before;
        if dropped > 0 {
            log::warn!("model {model_id}: {dropped} voxels fall outside the world and were dropped");
        }
        observer.on_model_placed(model_id);

        self.remaining[model_id] = self.remaining[model_id].saturating_sub(1);
        if self.remaining[model_id] == 0 {
            self.models[model_id] = None;
            log::debug!("released model buffer {model_id}");
            observer.on_model_released(model_id);
        }
        Ok(())
    }

    /// Run every remaining step.
    pub fn run(&mut self, observer: &mut dyn FlattenObserver) -> Result<(), FlattenError> {
        while self.step(observer)? {}
        Ok(())
    }

    pub fn into_world(self) -> WorldData {
        self.world
    }
}

/// Flatten a whole scene in one call.
pub fn flatten_scene(
    scene: VoxScene,
    observer: &mut dyn FlattenObserver,
) -> Result<WorldData, FlattenError> {
    let mut flattener = SceneFlattener::new(scene);
    flattener.run(observer)?;
    Ok(flattener.into_world())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{UVec3, Vec3};
    use voxvfx_vox::axis::Rotation;
    use voxvfx_vox::{read_scene, SceneWriter, WriterModel};

    #[derive(Default)]
    struct Recorder {
        events: Vec<(&'static str, usize)>,
    }

    impl FlattenObserver for Recorder {
        fn on_model_placed(&mut self, model_id: usize) {
            self.events.push(("placed", model_id));
        }
        fn on_model_released(&mut self, model_id: usize) {
            self.events.push(("released", model_id));
        }
    }

    fn single_voxel() -> WriterModel {
        WriterModel {
            size: UVec3::ONE,
            voxels: vec![[0, 0, 0, 5]],
        }
    }

    fn scene(writer: &SceneWriter) -> VoxScene {
        read_scene(writer.to_bytes()).expect("scene decodes")
    }

    #[test]
    fn test_place_model_centers_on_pivot() {
        let mut grid = VoxelGrid::with_extent(UVec3::ZERO).expect("grid");
        grid.set(UVec3::ZERO, 3);
        let placed = place_model(&grid, Mat4::IDENTITY);
        assert_eq!(placed, vec![(IVec3::splat(1000), 3)]);

        let moved = place_model(&grid, Mat4::from_translation(Vec3::new(4.0, -2.0, 0.0)));
        assert_eq!(moved, vec![(IVec3::new(1004, 998, 1000), 3)]);
    }

    #[test]
    fn test_legacy_file_placed_at_identity() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        let world = flatten_scene(scene(&writer), &mut NoopObserver).expect("flattens");
        assert_eq!(world.voxel_count(), 1);
        assert_eq!(world.voxel_at(IVec3::splat(1000)).map(|v| v.color), Some(5));
    }

    #[test]
    fn test_model_released_after_last_placement() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::ZERO);
        writer.add_group(1, &[2, 4, 6]);
        for (i, x) in [(2, 0), (4, 10), (6, 20)] {
            writer.add_transform(i, i + 1, Rotation::IDENTITY, IVec3::new(x, 0, 0));
            writer.add_shape(i + 1, &[0]);
        }

        let mut recorder = Recorder::default();
        let world = flatten_scene(scene(&writer), &mut recorder).expect("flattens");
        assert_eq!(
            recorder.events,
            vec![
                ("placed", 0),
                ("placed", 0),
                ("placed", 0),
                ("released", 0)
            ]
        );
        assert_eq!(world.voxel_count(), 3);
    }

    #[test]
    fn test_group_children_inherit_parent_transform() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::new(100, 0, 0));
        writer.add_group(1, &[2]);
        writer.add_transform(2, 3, Rotation::IDENTITY, IVec3::new(5, 0, 0));
        writer.add_shape(3, &[0]);

        let world = flatten_scene(scene(&writer), &mut NoopObserver).expect("flattens");
        // File +X maps to world -X.
        assert!(world.voxel_at(IVec3::new(1000 - 105, 1000, 1000)).is_some());
    }

    #[test]
    fn test_missing_node_fails() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        writer.add_transform(0, 42, Rotation::IDENTITY, IVec3::ZERO);
        let result = flatten_scene(scene(&writer), &mut NoopObserver);
        assert!(matches!(
            result,
            Err(FlattenError::MissingNode {
                transform: 0,
                child: 42
            })
        ));
    }

    #[test]
    fn test_missing_model_fails() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::ZERO);
        writer.add_shape(1, &[3]);
        let result = flatten_scene(scene(&writer), &mut NoopObserver);
        assert!(matches!(
            result,
            Err(FlattenError::MissingModel { model_id: 3, .. })
        ));
    }

    #[test]
    fn test_out_of_world_voxels_dropped() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::new(0, 5000, 0));
        writer.add_shape(1, &[0]);
        let world = flatten_scene(scene(&writer), &mut NoopObserver).expect("flattens");
        assert!(world.is_empty());
        assert_eq!(world.dropped_count(), 1);
    }

    #[test]
    fn test_extreme_translations_dropped() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::ZERO);
        writer.add_group(1, &[2, 4, 6]);
        let extremes = [
            IVec3::new(i32::MIN, 0, 0),
            IVec3::new(0, 0, i32::MAX),
            IVec3::new(i32::MAX, i32::MIN, i32::MAX),
        ];
        for (id, t) in [2, 4, 6].into_iter().zip(extremes) {
            writer.add_transform(id, id + 1, Rotation::IDENTITY, t);
            writer.add_shape(id + 1, &[0]);
        }

        let world = flatten_scene(scene(&writer), &mut NoopObserver).expect("flattens");
        assert!(world.is_empty());
        assert_eq!(world.dropped_count(), 3);
    }

    #[test]
    fn test_place_model_saturates_far_points() {
        let mut grid = VoxelGrid::with_extent(UVec3::ZERO).expect("grid");
        grid.set(UVec3::ZERO, 1);
        let far = Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0e9));
        assert_eq!(
            place_model(&grid, far),
            vec![(IVec3::new(1000, 1000, i32::MAX), 1)]
        );
    }

    #[test]
    fn test_interior_voxels_culled() {
        let mut voxels = Vec::new();
        for x in 0..3u8 {
            for y in 0..3u8 {
                for z in 0..3u8 {
                    voxels.push([x, y, z, 1]);
                }
            }
        }
        let mut writer = SceneWriter::default();
        writer.add_model(WriterModel {
            size: UVec3::splat(3),
            voxels,
        });
        let world = flatten_scene(scene(&writer), &mut NoopObserver).expect("flattens");
        assert_eq!(world.voxel_count(), 26);
    }

    #[test]
    fn test_progress_reaches_one() {
        let mut writer = SceneWriter::default();
        writer.add_model(single_voxel());
        writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::ZERO);
        writer.add_shape(1, &[0]);
        let mut flattener = SceneFlattener::new(scene(&writer));
        assert_eq!(flattener.progress(), 0.0);
        assert!(!flattener.step(&mut NoopObserver).expect("step"));
        assert_eq!(flattener.progress(), 1.0);
        assert!(flattener.is_done());
    }
}
