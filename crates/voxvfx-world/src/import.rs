use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use voxvfx_core::material::MaterialTable;
use voxvfx_vox::{resolve_materials, ReadStep, VoxError, VoxReader};

use crate::flatten::{FlattenObserver, NoopObserver, SceneFlattener};
use crate::world_data::WorldData;

/// Shared flag that stops an [`ImportSession`] at its next step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub enum ImportStep {
    /// Overall progress in [0, 1]. Reading covers the first half.
    Progress(f32),
    /// Terminal step. None when the file was unusable, flattening failed,
    /// or the session was cancelled.
    Finished(Option<ImportedScene>),
}

/// A fully flattened file ready for LOD computation.
#[derive(Debug)]
pub struct ImportedScene {
    pub world: WorldData,
    pub warnings: Vec<String>,
}

enum Phase {
    /// The header was unusable; the first step reports it.
    Rejected(VoxError),
    Reading(VoxReader),
    Flattening {
        flattener: SceneFlattener,
        warnings: Vec<String>,
        materials: Box<MaterialTable>,
    },
    Done,
}

/// Step-wise import of one file: decode, then flatten into the world grid.
///
/// Drive it as an iterator. It yields [`ImportStep::Progress`] values and
/// ends with exactly one [`ImportStep::Finished`], including when the bytes
/// are not a readable file at all.
pub struct ImportSession {
    phase: Phase,
    cancel: CancelToken,
    observer: Box<dyn FlattenObserver + Send>,
}

impl ImportSession {
    pub fn new(bytes: Vec<u8>, cancel: CancelToken) -> Self {
        let phase = match VoxReader::open(bytes) {
            Ok(reader) => Phase::Reading(reader),
            Err(err) => Phase::Rejected(err),
        };
        Self {
            phase,
            cancel,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn FlattenObserver + Send>) -> Self {
        self.observer = observer;
        self
    }

    /// Run to completion, discarding progress.
    pub fn run(self) -> Option<ImportedScene> {
        self.filter_map(|step| match step {
            ImportStep::Finished(scene) => Some(scene),
            ImportStep::Progress(_) => None,
        })
        .next()
        .flatten()
    }

    fn finish(&mut self, scene: Option<ImportedScene>) -> ImportStep {
        self.phase = Phase::Done;
        ImportStep::Finished(scene)
    }
}

impl Iterator for ImportSession {
    type Item = ImportStep;

    fn next(&mut self) -> Option<ImportStep> {
        if matches!(self.phase, Phase::Done) {
            return None;
        }
        if self.cancel.is_cancelled() {
            log::info!("import cancelled");
            return Some(self.finish(None));
        }

        match &mut self.phase {
            Phase::Rejected(err) => {
                log::error!("failed to read scene: {err}");
                Some(self.finish(None))
            }
            Phase::Reading(reader) => match reader.next() {
                Some(ReadStep::Progress(p)) => Some(ImportStep::Progress(p * 0.5)),
                Some(ReadStep::Finished(Some(scene))) => {
                    for warning in &scene.warnings {
                        log::warn!("{warning}");
                    }
                    let materials = Box::new(resolve_materials(&scene.palette, &scene.materials));
                    let warnings = scene.warnings.clone();
                    log::info!(
                        "decoded {} models, {} voxels",
                        scene.models.len(),
                        scene.voxel_count()
                    );
                    self.phase = Phase::Flattening {
                        flattener: SceneFlattener::new(scene),
                        warnings,
                        materials,
                    };
                    Some(ImportStep::Progress(0.5))
                }
                Some(ReadStep::Finished(None)) | None => Some(self.finish(None)),
            },
            Phase::Flattening { flattener, .. } => {
                if let Err(e) = flattener.step(self.observer.as_mut()) {
                    log::error!("failed to flatten scene: {e}");
                    return Some(self.finish(None));
                }
                if !flattener.is_done() {
                    return Some(ImportStep::Progress(0.5 + flattener.progress() * 0.5));
                }
                let Phase::Flattening {
                    flattener,
                    warnings,
                    materials,
                } = std::mem::replace(&mut self.phase, Phase::Done)
                else {
                    return None;
                };
                let mut world = flattener.into_world();
                world.set_materials(*materials);
                if world.dropped_count() > 0 {
                    log::warn!(
                        "{} voxels were outside the world bounds",
                        world.dropped_count()
                    );
                }
                Some(ImportStep::Finished(Some(ImportedScene { world, warnings })))
            }
            Phase::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{IVec3, UVec3};
    use voxvfx_vox::axis::Rotation;
    use voxvfx_vox::{SceneWriter, WriterModel};

    fn file_bytes(placements: i32) -> Vec<u8> {
        let mut writer = SceneWriter::default();
        writer.add_model(WriterModel {
            size: UVec3::new(2, 2, 1),
            voxels: vec![[0, 0, 0, 1], [1, 1, 0, 2], [0, 1, 0, 0]],
        });
        let children: Vec<i32> = (0..placements).map(|i| 2 + i * 2).collect();
        writer.add_transform(0, 1, Rotation::IDENTITY, IVec3::ZERO);
        writer.add_group(1, &children);
        for (i, id) in children.iter().enumerate() {
            writer.add_transform(*id, id + 1, Rotation::IDENTITY, IVec3::new(i as i32 * 10, 0, 0));
            writer.add_shape(id + 1, &[0]);
        }
        writer.to_bytes()
    }

    #[test]
    fn test_import_to_completion() {
        let session = ImportSession::new(file_bytes(2), CancelToken::new());
        let steps: Vec<ImportStep> = session.collect();
        let progress: Vec<f32> = steps
            .iter()
            .filter_map(|s| match s {
                ImportStep::Progress(p) => Some(*p),
                ImportStep::Finished(_) => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));

        let finished: Vec<&ImportStep> = steps
            .iter()
            .filter(|s| matches!(s, ImportStep::Finished(_)))
            .collect();
        assert_eq!(finished.len(), 1);
        let Some(ImportStep::Finished(Some(scene))) = steps.last() else {
            panic!("expected a scene");
        };
        assert_eq!(scene.world.voxel_count(), 4);
    }

    #[test]
    fn test_empty_voxels_never_stored() {
        let scene = ImportSession::new(file_bytes(1), CancelToken::new())
            .run()
            .expect("scene");
        for index in scene.world.occupied_chunks() {
            let cells = scene.world.chunk(index).expect("chunk");
            assert!(cells.values().all(|v| v.color != 0));
        }
    }

    #[test]
    fn test_cancel_before_start() {
        let cancel = CancelToken::new();
        let mut session = ImportSession::new(file_bytes(1), cancel.clone());
        cancel.cancel();
        assert!(matches!(session.next(), Some(ImportStep::Finished(None))));
        assert!(session.next().is_none());
    }

    #[test]
    fn test_cancel_mid_import() {
        let cancel = CancelToken::new();
        let mut session = ImportSession::new(file_bytes(3), cancel.clone());
        assert!(matches!(session.next(), Some(ImportStep::Progress(_))));
        cancel.cancel();
        let rest: Vec<ImportStep> = session.collect();
        assert_eq!(rest.len(), 1);
        assert!(matches!(rest[0], ImportStep::Finished(None)));
    }

    #[test]
    fn test_bad_header_finishes_without_scene() {
        let steps: Vec<ImportStep> =
            ImportSession::new(b"NOPE0000".to_vec(), CancelToken::new()).collect();
        assert_eq!(steps.len(), 1);
        assert!(matches!(steps[0], ImportStep::Finished(None)));

        let mut junk = b"VOX ".to_vec();
        junk.extend_from_slice(&[0; 4]);
        assert!(ImportSession::new(junk, CancelToken::new()).run().is_none());
    }

    #[test]
    fn test_unknown_material_type_fails_import() {
        let mut writer = SceneWriter::default();
        writer.add_model(WriterModel {
            size: UVec3::ONE,
            voxels: vec![[0, 0, 0, 2]],
        });
        let mut dict = voxvfx_vox::Dict::default();
        dict.insert("_type", "_cloud");
        writer.add_material(2, dict);

        let steps: Vec<ImportStep> =
            ImportSession::new(writer.to_bytes(), CancelToken::new()).collect();
        let finished: Vec<&ImportStep> = steps
            .iter()
            .filter(|s| matches!(s, ImportStep::Finished(_)))
            .collect();
        assert_eq!(finished.len(), 1);
        assert!(matches!(steps.last(), Some(ImportStep::Finished(None))));
    }

    #[test]
    fn test_dangling_reference_yields_no_scene() {
        let mut writer = SceneWriter::default();
        writer.add_model(WriterModel {
            size: UVec3::ONE,
            voxels: vec![[0, 0, 0, 1]],
        });
        writer.add_transform(0, 9, Rotation::IDENTITY, IVec3::ZERO);
        let result = ImportSession::new(writer.to_bytes(), CancelToken::new())
            .run();
        assert!(result.is_none());
    }

    #[test]
    fn test_materials_resolved_into_world() {
        let mut writer = SceneWriter::default();
        writer.add_model(WriterModel {
            size: UVec3::ONE,
            voxels: vec![[0, 0, 0, 3]],
        });
        let mut dict = voxvfx_vox::Dict::default();
        dict.insert("_type", "_glass");
        dict.insert("_alpha", "0.3");
        writer.add_material(3, dict);
        let scene = ImportSession::new(writer.to_bytes(), CancelToken::new())
            .run()
            .expect("scene");
        assert!(!scene.world.materials()[3].is_opaque());
    }
}
