pub mod error;
pub mod flatten;
pub mod import;
pub mod lod;
pub mod visibility;
pub mod world_data;

pub use error::FlattenError;
pub use flatten::{flatten_scene, FlattenObserver, NoopObserver, SceneFlattener};
pub use import::{CancelToken, ImportSession, ImportStep, ImportedScene};
pub use lod::{compute_chunk_lods, compute_world_lods, ChunkLod, LodSink, LodVoxel};
pub use world_data::{ChunkCells, RawVoxel, WorldData};
