use std::collections::HashMap;

use glam::{Mat3, Mat4, UVec3, Vec3};

use crate::cursor::Dict;
use crate::material::MaterialChunk;
use crate::palette::Palette;

/// Dense color-index grid of one model, in world axes.
///
/// Index 0 means empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    size: UVec3,
    colors: Vec<u8>,
}

impl VoxelGrid {
    /// Allocate a grid from zero-based extents (largest valid index per axis).
    ///
    /// None when the cell count does not fit in memory indices.
    pub fn with_extent(extent: UVec3) -> Option<Self> {
        let size = UVec3::new(
            extent.x.checked_add(1)?,
            extent.y.checked_add(1)?,
            extent.z.checked_add(1)?,
        );
        let len = (size.x as usize)
            .checked_mul(size.y as usize)?
            .checked_mul(size.z as usize)?;
        Some(Self {
            size,
            colors: vec![0; len],
        })
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn contains(&self, pos: UVec3) -> bool {
        pos.cmplt(self.size).all()
    }

    pub fn index(&self, pos: UVec3) -> usize {
        let (sx, sy) = (self.size.x as usize, self.size.y as usize);
        pos.x as usize + sx * pos.y as usize + sx * sy * pos.z as usize
    }

    pub fn position(&self, index: usize) -> UVec3 {
        let sx = self.size.x as usize;
        let plane = sx * self.size.y as usize;
        UVec3::new(
            (index % sx) as u32,
            ((index % plane) / sx) as u32,
            (index / plane) as u32,
        )
    }

    pub fn get(&self, pos: UVec3) -> u8 {
        if self.contains(pos) {
            self.colors[self.index(pos)]
        } else {
            0
        }
    }

    /// Store a color. Out-of-range positions are ignored and reported false.
    pub fn set(&mut self, pos: UVec3, color: u8) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let index = self.index(pos);
        self.colors[index] = color;
        true
    }

    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    pub fn occupied_count(&self) -> usize {
        self.colors.iter().filter(|&&c| c != 0).count()
    }

    /// Half-size pivot the model is centered on.
    pub fn pivot(&self) -> Vec3 {
        self.size.as_vec3() * 0.5
    }
}

/// One keyframe of a transform node, already in world axes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformFrame {
    /// Packed rotation byte as stored in the file.
    pub packed_rotation: u8,
    pub rotation: Mat3,
    pub translation: Vec3,
    pub frame_index: u32,
}

impl TransformFrame {
    pub fn identity() -> Self {
        Self {
            packed_rotation: crate::axis::Rotation::IDENTITY.0,
            rotation: Mat3::IDENTITY,
            translation: Vec3::ZERO,
            frame_index: 0,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols(
            self.rotation.x_axis.extend(0.0),
            self.rotation.y_axis.extend(0.0),
            self.rotation.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    pub id: i32,
    pub attributes: Dict,
    pub child_id: i32,
    pub layer_id: i32,
    pub frames: Vec<TransformFrame>,
}

impl TransformNode {
    /// Matrix of the first keyframe (identity when the node has no frames).
    pub fn matrix(&self) -> Mat4 {
        self.frames
            .first()
            .map(TransformFrame::matrix)
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get("_name")
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes.get_bool("_hidden")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub id: i32,
    pub attributes: Dict,
    pub children: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeModel {
    pub model_id: i32,
    pub attributes: Dict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeNode {
    pub id: i32,
    pub attributes: Dict,
    pub models: Vec<ShapeModel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub id: i32,
    pub attributes: Dict,
}

/// Everything decoded from one file.
#[derive(Debug, Clone)]
pub struct VoxScene {
    pub version: i32,
    pub models: Vec<VoxelGrid>,
    pub palette: Palette,
    pub materials: Vec<MaterialChunk>,
    /// Transform nodes in file order.
    pub transforms: Vec<TransformNode>,
    pub groups: HashMap<i32, GroupNode>,
    pub shapes: HashMap<i32, ShapeNode>,
    pub layers: Vec<Layer>,
    pub render_settings: Vec<Dict>,
    pub index_map: Option<[u8; 256]>,
    /// Compatibility and recovery warnings collected while reading.
    pub warnings: Vec<String>,
}

impl VoxScene {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            models: Vec::new(),
            palette: Palette::default(),
            materials: Vec::new(),
            transforms: Vec::new(),
            groups: HashMap::new(),
            shapes: HashMap::new(),
            layers: Vec::new(),
            render_settings: Vec::new(),
            index_map: None,
            warnings: Vec::new(),
        }
    }

    pub fn has_scene_graph(&self) -> bool {
        !self.transforms.is_empty()
    }

    pub fn voxel_count(&self) -> usize {
        self.models.iter().map(VoxelGrid::occupied_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_extent_adds_one() {
        let grid = VoxelGrid::with_extent(UVec3::new(1, 2, 3)).expect("grid");
        assert_eq!(grid.size(), UVec3::new(2, 3, 4));
        assert_eq!(grid.colors().len(), 24);
    }

    #[test]
    fn test_grid_index_roundtrip() {
        let grid = VoxelGrid::with_extent(UVec3::new(4, 2, 6)).expect("grid");
        for i in 0..grid.colors().len() {
            assert_eq!(grid.index(grid.position(i)), i);
        }
    }

    #[test]
    fn test_grid_rejects_unaddressable_extent() {
        assert!(VoxelGrid::with_extent(UVec3::new(u32::MAX, 0, 0)).is_none());
    }

    #[test]
    fn test_grid_index_past_u32_range() {
        let grid = VoxelGrid {
            size: UVec3::splat(2048),
            colors: Vec::new(),
        };
        let far = UVec3::new(2047, 2047, 2047);
        assert_eq!(grid.index(far), (1usize << 33) - 1);
        assert_eq!(grid.position(grid.index(far)), far);
    }

    #[test]
    fn test_grid_set_out_of_range() {
        let mut grid = VoxelGrid::with_extent(UVec3::ZERO).expect("grid");
        assert!(grid.set(UVec3::ZERO, 9));
        assert!(!grid.set(UVec3::new(1, 0, 0), 9));
        assert_eq!(grid.get(UVec3::new(1, 0, 0)), 0);
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn test_frame_matrix_applies_translation() {
        let frame = TransformFrame {
            translation: Vec3::new(1.0, 2.0, 3.0),
            ..TransformFrame::identity()
        };
        let p = frame.matrix().transform_point3(Vec3::ONE);
        assert_eq!(p, Vec3::new(2.0, 3.0, 4.0));
    }
}
