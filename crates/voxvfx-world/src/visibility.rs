use glam::{IVec3, UVec3};
use rayon::prelude::*;
use voxvfx_core::direction::FaceMask;
use voxvfx_vox::VoxelGrid;

/// Face mask of the voxel at `pos` given an occupancy query.
///
/// A face is visible when the neighbor `step` voxels away in that direction
/// is not occupied. The query decides how out-of-range neighbors count.
pub fn face_mask(pos: IVec3, step: i32, occupied: impl Fn(IVec3) -> bool) -> FaceMask {
    FaceMask::from_fn(|face| !occupied(pos + face.offset() * step))
}

/// Visible faces of one model voxel. Out-of-model neighbors are empty.
pub fn model_face_mask(grid: &VoxelGrid, pos: UVec3) -> FaceMask {
    face_mask(pos.as_ivec3(), 1, |n| {
        n.cmpge(IVec3::ZERO).all() && grid.get(n.as_uvec3()) != 0
    })
}

/// Occupied voxels of a model with at least one visible face, in grid order.
pub fn surface_voxels(grid: &VoxelGrid) -> Vec<(UVec3, u8)> {
    grid.colors()
        .par_iter()
        .enumerate()
        .filter(|(_, color)| **color != 0)
        .filter_map(|(i, &color)| {
            let pos = grid.position(i);
            (!model_face_mask(grid, pos).is_empty()).then_some((pos, color))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxvfx_core::direction::Face;

    fn solid(n: u32) -> VoxelGrid {
        let mut grid = VoxelGrid::with_extent(UVec3::splat(n - 1)).expect("grid");
        for i in 0..grid.colors().len() {
            let pos = grid.position(i);
            grid.set(pos, 1);
        }
        grid
    }

    #[test]
    fn test_isolated_voxel_all_faces() {
        let grid = solid(1);
        assert_eq!(model_face_mask(&grid, UVec3::ZERO), FaceMask::ALL);
    }

    #[test]
    fn test_surrounded_voxel_hidden() {
        let grid = solid(3);
        assert!(model_face_mask(&grid, UVec3::ONE).is_empty());
        let corner = model_face_mask(&grid, UVec3::ZERO);
        assert!(corner.contains(Face::Left));
        assert!(corner.contains(Face::Bottom));
        assert!(corner.contains(Face::Back));
        assert_eq!(corner.count(), 3);
    }

    #[test]
    fn test_surface_skips_interior() {
        let grid = solid(3);
        let surface = surface_voxels(&grid);
        assert_eq!(surface.len(), 26);
        assert!(!surface.iter().any(|(p, _)| *p == UVec3::ONE));
    }

    #[test]
    fn test_face_mask_with_step() {
        let occupied = |p: IVec3| p == IVec3::new(2, 0, 0);
        let mask = face_mask(IVec3::ZERO, 2, occupied);
        assert!(!mask.contains(Face::Right));
        assert_eq!(mask.count(), 5);
    }
}
