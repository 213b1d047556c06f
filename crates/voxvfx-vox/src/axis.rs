//! Conversion from the file's Z-up axes to the Y-up world convention.
//!
//! The file's Y and Z axes are swapped and the X and (new) Z axes are
//! mirrored. Everything the reader hands out is already in world axes.

use glam::{IVec3, Mat3, UVec3, Vec3};

/// Signed permutation taking a file-space direction to world space:
/// (x, y, z) -> (-x, z, -y).
pub const AXIS_CHANGE: Mat3 = Mat3::from_cols(
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(0.0, 1.0, 0.0),
);

/// World-axis grid size for a file-axis SIZE record.
pub fn remap_size(file_size: UVec3) -> UVec3 {
    UVec3::new(file_size.x, file_size.z, file_size.y)
}

/// Map a file-space voxel coordinate into a grid of world-axis `size`.
///
/// Mirrored axes are reflected inside the grid so indices stay in range.
pub fn remap_voxel(file: UVec3, size: UVec3) -> UVec3 {
    UVec3::new(size.x - 1 - file.x, file.z, size.z - 1 - file.y)
}

/// Inverse of [`remap_voxel`].
pub fn unmap_voxel(world: UVec3, size: UVec3) -> UVec3 {
    UVec3::new(size.x - 1 - world.x, size.z - 1 - world.z, world.y)
}

/// File-space translation expressed in world axes.
///
/// Negation saturates, so `i32::MIN` maps to `i32::MAX`.
pub fn remap_translation(file: IVec3) -> IVec3 {
    IVec3::new(file.x.saturating_neg(), file.z, file.y.saturating_neg())
}

/// Inverse of [`remap_translation`].
pub fn unmap_translation(world: IVec3) -> IVec3 {
    IVec3::new(world.x.saturating_neg(), world.z.saturating_neg(), world.y)
}

/// File-space rotation expressed in world axes (conjugation by [`AXIS_CHANGE`]).
pub fn remap_rotation(file: Mat3) -> Mat3 {
    AXIS_CHANGE * file * AXIS_CHANGE.transpose()
}

/// Packed rotation byte of a transform frame.
///
/// Bits 0-1: column of the non-zero entry in row 0. Bits 2-3: the same for
/// row 1. Row 2 takes the remaining column. Bits 4, 5, 6: row 0, 1, 2 entry
/// is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rotation(pub u8);

impl Rotation {
    pub const IDENTITY: Rotation = Rotation(0b0000_0100);

    /// Decode into a file-space signed permutation matrix.
    /// Returns None when rows 0 and 1 share a column or name column 3.
    pub fn matrix(self) -> Option<Mat3> {
        let bits = self.0;
        let col0 = (bits & 3) as usize;
        let col1 = ((bits >> 2) & 3) as usize;
        if col0 > 2 || col1 > 2 || col0 == col1 {
            return None;
        }
        let col2 = 3 - col0 - col1;

        let mut rows = [[0.0f32; 3]; 3];
        for (row, (col, sign_bit)) in [(col0, 4), (col1, 5), (col2, 6)].into_iter().enumerate() {
            rows[row][col] = if bits & (1 << sign_bit) != 0 { -1.0 } else { 1.0 };
        }
        // from_cols_array_2d is column-major, so build from rows and transpose.
        Some(Mat3::from_cols_array_2d(&rows).transpose())
    }

    /// Encode a signed permutation matrix, if it is one.
    pub fn from_matrix(m: Mat3) -> Option<Rotation> {
        let rows = m.transpose().to_cols_array_2d();
        let mut cols = [0u8; 3];
        let mut bits = 0u8;
        for (r, row) in rows.iter().enumerate() {
            let nonzero: Vec<usize> = (0..3).filter(|&c| row[c] != 0.0).collect();
            if nonzero.len() != 1 || row[nonzero[0]].abs() != 1.0 {
                return None;
            }
            cols[r] = nonzero[0] as u8;
            if row[nonzero[0]] < 0.0 {
                bits |= 1 << (4 + r);
            }
        }
        if cols[0] == cols[1] || cols[1] == cols[2] || cols[0] == cols[2] {
            return None;
        }
        Some(Rotation(bits | cols[0] | (cols[1] << 2)))
    }
}
