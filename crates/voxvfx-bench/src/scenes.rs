use glam::{IVec3, UVec3};
use voxvfx_vox::axis::Rotation;
use voxvfx_vox::writer::{SceneWriter, WriterModel};

/// How a synthetic scene is generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneKind {
    /// A single heightfield model `extent` voxels on a side.
    Terrain { extent: u32 },
    /// One hollow sphere model placed `copies` times on a grid.
    Instanced { radius: u32, copies: u32 },
}

/// Configuration for a single benchmark scene.
pub struct SceneConfig {
    pub name: &'static str,
    pub kind: SceneKind,
    /// Observer position relative to the centre of the imported world.
    pub camera_offset: [f32; 3],
}

/// The standard suite, from a small terrain up to a world spanning dozens
/// of chunks.
pub fn standard_scenes() -> Vec<SceneConfig> {
    vec![
        SceneConfig {
            name: "terrain-64",
            kind: SceneKind::Terrain { extent: 64 },
            camera_offset: [40.0, 60.0, 120.0],
        },
        SceneConfig {
            name: "terrain-256",
            kind: SceneKind::Terrain { extent: 256 },
            camera_offset: [80.0, 120.0, 350.0],
        },
        SceneConfig {
            name: "spheres-8",
            kind: SceneKind::Instanced {
                radius: 16,
                copies: 8,
            },
            camera_offset: [0.0, 50.0, 250.0],
        },
        SceneConfig {
            name: "spheres-64",
            kind: SceneKind::Instanced {
                radius: 24,
                copies: 64,
            },
            camera_offset: [100.0, 150.0, 700.0],
        },
    ]
}

/// Deterministic palette index in 1..=255 for a position.
fn color_at(x: u32, y: u32, z: u32) -> u8 {
    let hash = (x.wrapping_mul(31337) ^ y.wrapping_mul(7919) ^ z.wrapping_mul(104_729)) % 255;
    hash as u8 + 1
}

/// Column height of the terrain at (x, y), in file axes.
fn terrain_height(x: u32, y: u32, extent: u32) -> u32 {
    let fx = x as f32 / extent as f32 * std::f32::consts::TAU;
    let fy = y as f32 / extent as f32 * std::f32::consts::TAU;
    let wave = (fx * 2.0).sin() * (fy * 3.0).cos() * 0.5 + 0.5;
    let max = (extent / 4).max(2);
    1 + (wave * (max - 1) as f32) as u32
}

pub fn terrain_model(extent: u32) -> WriterModel {
    let extent = extent.clamp(1, 256);
    let depth = (extent / 4).max(2);
    let mut voxels = Vec::new();
    for x in 0..extent {
        for y in 0..extent {
            for z in 0..terrain_height(x, y, extent) {
                voxels.push([x as u8, y as u8, z as u8, color_at(x, y, z)]);
            }
        }
    }
    WriterModel {
        size: UVec3::new(extent, extent, depth),
        voxels,
    }
}

/// Sphere shell one voxel thick.
pub fn sphere_model(radius: u32) -> WriterModel {
    let radius = radius.clamp(1, 127);
    let side = radius * 2 + 1;
    let r = radius as f32;
    let mut voxels = Vec::new();
    for x in 0..side {
        for y in 0..side {
            for z in 0..side {
                let d = UVec3::new(x, y, z).as_vec3() - glam::Vec3::splat(r);
                let len = d.length();
                if len <= r && len > r - 1.5 {
                    voxels.push([x as u8, y as u8, z as u8, color_at(x, y, z)]);
                }
            }
        }
    }
    WriterModel {
        size: UVec3::splat(side),
        voxels,
    }
}

/// Serialize a scene to `.vox` bytes.
pub fn generate_scene(kind: SceneKind) -> Vec<u8> {
    let mut writer = SceneWriter::default();
    match kind {
        SceneKind::Terrain { extent } => {
            writer.add_model(terrain_model(extent));
        }
        SceneKind::Instanced { radius, copies } => {
            let model = writer.add_model(sphere_model(radius));
            let per_row = (copies as f32).sqrt().ceil().max(1.0) as u32;
            let spacing = (radius * 2 + 8) as i32;

            // Root transform -> group -> (transform -> shape) per copy.
            let children: Vec<i32> = (0..copies as i32).map(|i| 2 + i * 2).collect();
            writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::ZERO);
            writer.add_group(1, &children);
            for (i, &id) in children.iter().enumerate() {
                let (col, row) = (i as u32 % per_row, i as u32 / per_row);
                let offset = (per_row as i32 - 1) * spacing / 2;
                let translation = IVec3::new(
                    col as i32 * spacing - offset,
                    row as i32 * spacing - offset,
                    0,
                );
                writer.add_transform(id, id + 1, Rotation::IDENTITY, translation);
                writer.add_shape(id + 1, &[model]);
            }
        }
    }
    writer.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_never_exceeds_model_size() {
        let model = terrain_model(64);
        assert!(!model.voxels.is_empty());
        assert!(model
            .voxels
            .iter()
            .all(|v| (v[2] as u32) < model.size.z && v[3] != 0));
    }

    #[test]
    fn test_sphere_is_hollow() {
        let model = sphere_model(8);
        let center = [8u8, 8, 8];
        assert!(!model
            .voxels
            .iter()
            .any(|v| v[0] == center[0] && v[1] == center[1] && v[2] == center[2]));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let kind = SceneKind::Instanced {
            radius: 6,
            copies: 4,
        };
        assert_eq!(generate_scene(kind), generate_scene(kind));
    }
}
