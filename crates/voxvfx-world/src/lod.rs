use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use glam::{IVec3, UVec3, Vec3};
use rayon::prelude::*;
use voxvfx_core::constants::{CHUNK_SIZE, MATERIAL_SLOTS};
use voxvfx_core::direction::{Face, FaceMask};
use voxvfx_core::material::{opacity_mask, MaterialTable};
use voxvfx_core::math::{chunk_world_position, local_index, local_position};
use voxvfx_core::types::{LodLevel, Orientation};

use crate::visibility::face_mask;
use crate::world_data::{ChunkCells, WorldData};

/// A voxel of one LOD level, annotated for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodVoxel {
    pub local: UVec3,
    pub color: u8,
    pub faces: FaceMask,
    pub orientation: Orientation,
}

/// One LOD level of one chunk. Voxels are ordered by local index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkLod {
    pub chunk_index: u32,
    pub lod: LodLevel,
    pub world_position: Vec3,
    pub voxels: Vec<LodVoxel>,
}

impl ChunkLod {
    pub fn center(&self) -> Vec3 {
        self.world_position + Vec3::splat(CHUNK_SIZE as f32 * 0.5)
    }
}

/// Receiver for LOD results produced on worker threads.
pub trait LodSink: Sync {
    /// Receives LOD 1, 2 and 4 of a chunk, in that order.
    fn on_chunk_lod(&self, lod: ChunkLod);
    /// Fraction of chunks finished. Never decreases.
    fn on_progress(&self, _fraction: f32) {}
    /// Called exactly once after every chunk has been delivered.
    fn on_finished(&self) {}
}

type CellSet = BTreeMap<u32, u8>;

/// Keep one voxel per `cell`-aligned block, placed at the block origin.
///
/// The lowest local index in a block wins.
fn decimate(input: &CellSet, cell: u32) -> CellSet {
    let mut out = CellSet::new();
    for (&index, &color) in input {
        let origin = (local_position(index) / cell) * cell;
        out.entry(local_index(origin)).or_insert(color);
    }
    out
}

fn annotate(cells: &CellSet, step: u32, opaque: &[bool; MATERIAL_SLOTS]) -> Vec<LodVoxel> {
    let size = CHUNK_SIZE as i32;
    let occupied = |p: IVec3| {
        // Neighbors outside the chunk count as empty.
        p.cmpge(IVec3::ZERO).all()
            && p.cmplt(IVec3::splat(size)).all()
            && cells.contains_key(&local_index(p.as_uvec3()))
    };
    cells
        .iter()
        .map(|(&index, &color)| {
            let local = local_position(index);
            let faces = face_mask(local.as_ivec3(), step as i32, &occupied);
            let orientation = if faces == FaceMask(Face::Top.bit()) && opaque[color as usize] {
                Orientation::TopQuad
            } else {
                Orientation::Cube
            };
            LodVoxel {
                local,
                color,
                faces,
                orientation,
            }
        })
        .collect()
}

/// Build LOD 1, 2 and 4 for one chunk.
///
/// The full level keeps every voxel. Coarser levels are derived from the
/// previous one, with face masks recomputed at the coarser stride.
pub fn compute_chunk_lods(
    chunk_index: u32,
    cells: &ChunkCells,
    materials: &MaterialTable,
) -> [ChunkLod; 3] {
    let opaque = opacity_mask(materials);
    let world_position = chunk_world_position(chunk_index);

    let full: CellSet = cells.iter().map(|(&i, v)| (i, v.color)).collect();
    let half = decimate(&full, LodLevel::Half.step());
    let quarter = decimate(&half, LodLevel::Quarter.step());

    let build = |lod: LodLevel, set: &CellSet| ChunkLod {
        chunk_index,
        lod,
        world_position,
        voxels: annotate(set, lod.step(), &opaque),
    };
    [
        build(LodLevel::Full, &full),
        build(LodLevel::Half, &half),
        build(LodLevel::Quarter, &quarter),
    ]
}

/// Compute LODs for every occupied chunk of `world` on the rayon pool.
pub fn compute_world_lods(world: &WorldData, sink: &dyn LodSink) {
    let chunks = world.occupied_chunks();
    let total = chunks.len();
    let finished = AtomicBool::new(false);

    if total == 0 {
        sink.on_progress(1.0);
        if !finished.swap(true, Ordering::AcqRel) {
            sink.on_finished();
        }
        return;
    }

    log::info!("computing LODs for {total} chunks");
    let done = Mutex::new(0usize);
    chunks.par_iter().for_each(|&index| {
        let Some(cells) = world.chunk(index) else {
            return;
        };
        for lod in compute_chunk_lods(index, cells, world.materials()) {
            sink.on_chunk_lod(lod);
        }

        let mut count = match done.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *count += 1;
        sink.on_progress(*count as f32 / total as f32);
        if *count == total && !finished.swap(true, Ordering::AcqRel) {
            log::info!("LOD batch finished ({total} chunks)");
            sink.on_finished();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use voxvfx_core::math::chunk_index;
    use voxvfx_core::material::default_material_table;

    use crate::world_data::RawVoxel;

    fn cells(points: &[(UVec3, u8)]) -> ChunkCells {
        points
            .iter()
            .map(|&(p, c)| (local_index(p), RawVoxel::new(p, c)))
            .collect()
    }

    fn solid_block(n: u32) -> ChunkCells {
        let mut points = Vec::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    points.push((UVec3::new(x, y, z), 1));
                }
            }
        }
        cells(&points)
    }

    #[derive(Default)]
    struct Collector {
        lods: Mutex<Vec<ChunkLod>>,
        progress: Mutex<Vec<f32>>,
        finished: Mutex<u32>,
    }

    impl LodSink for Collector {
        fn on_chunk_lod(&self, lod: ChunkLod) {
            self.lods.lock().expect("lock").push(lod);
        }
        fn on_progress(&self, fraction: f32) {
            self.progress.lock().expect("lock").push(fraction);
        }
        fn on_finished(&self) {
            *self.finished.lock().expect("lock") += 1;
        }
    }

    #[test]
    fn test_full_level_keeps_every_voxel() {
        let table = default_material_table();
        let [full, _, _] = compute_chunk_lods(0, &solid_block(5), &table);
        assert_eq!(full.voxels.len(), 125);
        assert_eq!(full.lod, LodLevel::Full);
        let interior = full
            .voxels
            .iter()
            .find(|v| v.local == UVec3::splat(2))
            .expect("interior voxel");
        assert!(interior.faces.is_empty());
    }

    #[test]
    fn test_voxel_counts_non_increasing() {
        let table = default_material_table();
        let [full, half, quarter] = compute_chunk_lods(0, &solid_block(9), &table);
        assert!(full.voxels.len() >= half.voxels.len());
        assert!(half.voxels.len() >= quarter.voxels.len());
        assert_eq!(half.voxels.len(), 125);
        assert_eq!(quarter.voxels.len(), 27);
    }

    #[test]
    fn test_coarse_voxels_aligned_to_cells() {
        let table = default_material_table();
        let [_, half, quarter] = compute_chunk_lods(0, &solid_block(9), &table);
        assert!(half.voxels.iter().all(|v| v.local % 2 == UVec3::ZERO));
        assert!(quarter.voxels.iter().all(|v| v.local % 4 == UVec3::ZERO));
    }

    #[test]
    fn test_every_coarse_cell_covered() {
        let table = default_material_table();
        let input = cells(&[
            (UVec3::new(1, 1, 1), 2),
            (UVec3::new(13, 7, 2), 3),
            (UVec3::new(99, 99, 99), 4),
        ]);
        let [_, half, quarter] = compute_chunk_lods(0, &input, &table);
        let half_cells: HashSet<UVec3> = half.voxels.iter().map(|v| v.local).collect();
        let quarter_cells: HashSet<UVec3> = quarter.voxels.iter().map(|v| v.local).collect();
        for (p, _) in input.values().map(|v| (v.position(), v.color)) {
            assert!(half_cells.contains(&((p / 2) * 2)));
            assert!(quarter_cells.contains(&((p / 4) * 4)));
        }
    }

    /// Deterministic scatter of `count` voxels over the whole chunk.
    fn scattered(count: usize, mut seed: u64) -> ChunkCells {
        let mut next = || {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (seed >> 33) as u32
        };
        let points: Vec<(UVec3, u8)> = (0..count)
            .map(|_| {
                let p = UVec3::new(next() % CHUNK_SIZE, next() % CHUNK_SIZE, next() % CHUNK_SIZE);
                (p, (next() % 255 + 1) as u8)
            })
            .collect();
        cells(&points)
    }

    #[test]
    fn test_coarse_levels_match_occupied_cells_exactly() {
        let table = default_material_table();
        for seed in [1, 7, 42] {
            let input = scattered(400, seed);
            let [full, half, quarter] = compute_chunk_lods(0, &input, &table);
            assert_eq!(full.voxels.len(), input.len());

            for coarse in [&half, &quarter] {
                let step = coarse.lod.step();
                let expected: HashSet<UVec3> = full
                    .voxels
                    .iter()
                    .map(|v| (v.local / step) * step)
                    .collect();
                let actual: HashSet<UVec3> = coarse.voxels.iter().map(|v| v.local).collect();
                // Every fine voxel is covered, and no coarse voxel is empty below.
                assert_eq!(actual, expected, "seed {seed}, step {step}");
                assert_eq!(coarse.voxels.len(), actual.len());

                for v in &coarse.voxels {
                    let cell_end = v.local + UVec3::splat(step);
                    assert!(full.voxels.iter().any(|f| f.color == v.color
                        && f.local.cmpge(v.local).all()
                        && f.local.cmplt(cell_end).all()));
                }
            }
        }
    }

    #[test]
    fn test_lowest_index_wins_block() {
        let table = default_material_table();
        let input = cells(&[(UVec3::new(1, 0, 0), 9), (UVec3::new(0, 1, 0), 8)]);
        let [_, half, _] = compute_chunk_lods(0, &input, &table);
        assert_eq!(half.voxels.len(), 1);
        // (1,0,0) has local index 1, lower than (0,1,0).
        assert_eq!(half.voxels[0].color, 9);
        assert_eq!(half.voxels[0].local, UVec3::ZERO);
    }

    #[test]
    fn test_boundary_faces_visible() {
        let table = default_material_table();
        let input = cells(&[(UVec3::new(99, 50, 50), 1)]);
        let [full, _, _] = compute_chunk_lods(0, &input, &table);
        assert!(full.voxels[0].faces.contains(Face::Right));
        assert_eq!(full.voxels[0].faces, FaceMask::ALL);
    }

    #[test]
    fn test_top_only_opaque_becomes_quad() {
        let table = default_material_table();
        // Two stacked 3x1x3 slabs. The top layer's center shows only its top.
        let mut points = Vec::new();
        for x in 0..3 {
            for z in 0..3 {
                points.push((UVec3::new(x, 0, z), 1));
                points.push((UVec3::new(x, 1, z), 1));
            }
        }
        let slab = cells(&points);
        let [full, _, _] = compute_chunk_lods(0, &slab, &table);
        let center = full
            .voxels
            .iter()
            .find(|v| v.local == UVec3::new(1, 1, 1))
            .expect("center");
        assert_eq!(center.faces, FaceMask(Face::Top.bit()));
        assert_eq!(center.orientation, Orientation::TopQuad);

        let mut glassy = table;
        glassy[1].alpha = 0.5;
        let [full, _, _] = compute_chunk_lods(0, &slab, &glassy);
        let center = full
            .voxels
            .iter()
            .find(|v| v.local == UVec3::new(1, 1, 1))
            .expect("center");
        assert_eq!(center.orientation, Orientation::Cube);
    }

    #[test]
    fn test_world_lods_three_per_chunk_and_single_finish() {
        let mut world = WorldData::new();
        world.insert(IVec3::new(5, 5, 5), 1);
        world.insert(IVec3::new(505, 5, 5), 1);
        world.insert(IVec3::new(5, 905, 1205), 1);

        let sink = Collector::default();
        compute_world_lods(&world, &sink);

        let lods = sink.lods.into_inner().expect("lock");
        assert_eq!(lods.len(), 9);
        let expected = chunk_index(IVec3::new(5, 0, 0)).expect("chunk");
        let ordered: Vec<LodLevel> = lods
            .iter()
            .filter(|l| l.chunk_index == expected)
            .map(|l| l.lod)
            .collect();
        assert_eq!(ordered, LodLevel::ALL.to_vec());

        let progress = sink.progress.into_inner().expect("lock");
        assert_eq!(progress.len(), 3);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().copied(), Some(1.0));
        assert_eq!(*sink.finished.lock().expect("lock"), 1);
    }

    #[test]
    fn test_empty_world_finishes_immediately() {
        let sink = Collector::default();
        compute_world_lods(&WorldData::new(), &sink);
        assert!(sink.lods.lock().expect("lock").is_empty());
        assert_eq!(*sink.finished.lock().expect("lock"), 1);
    }
}
