use crate::constants::MATERIAL_SLOTS;

/// Resolved surface description for one palette slot.
///
/// 48 bytes, repr(C) so the table uploads as-is to the material buffer.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct MaterialRecord {
    /// Base color, linear 0.0–1.0.
    pub color: [f32; 3],
    /// 1.0 = fully opaque, below 1.0 = glass or media.
    pub alpha: f32,
    pub emission: [f32; 3],
    pub emission_power: f32,
    pub metallic: f32,
    pub smoothness: f32,
    pub ior: f32,
    pub _pad: f32,
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            color: [0.0; 3],
            alpha: 1.0,
            emission: [0.0; 3],
            emission_power: 0.0,
            metallic: 0.0,
            smoothness: 0.0,
            ior: 0.0,
            _pad: 0.0,
        }
    }
}

impl MaterialRecord {
    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }
}

/// Fixed table of 256 materials addressed by voxel color index.
pub type MaterialTable = [MaterialRecord; MATERIAL_SLOTS];

/// Table with every slot default-initialized.
pub fn default_material_table() -> MaterialTable {
    [MaterialRecord::default(); MATERIAL_SLOTS]
}

/// Per-slot opacity lookup used by culling and instancing.
pub fn opacity_mask(table: &MaterialTable) -> [bool; MATERIAL_SLOTS] {
    let mut mask = [true; MATERIAL_SLOTS];
    for (slot, material) in table.iter().enumerate() {
        mask[slot] = material.is_opaque();
    }
    mask
}
