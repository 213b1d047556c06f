pub mod assembler;
pub mod backend;
pub mod catalog;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod loader;
pub mod path_tracing;
pub mod runtime;
pub mod selector;

pub use backend::{AccelerationStructure, BufferBinding, InstanceHandle, InstanceMesh, RenderBackend};
pub use catalog::ChunkCatalog;
pub use error::BackendError;
pub use gpu::{RenderParams, WgpuBackend};
pub use headless::{HeadlessBackend, RecordingAccelerationStructure};
pub use loader::{build_catalog, CatalogBuilder};
pub use path_tracing::{PathTracer, SyncStats};
pub use runtime::VoxRuntime;
pub use selector::{Observer, RefreshTrigger};
