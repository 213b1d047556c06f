pub mod config;
pub mod constants;
pub mod direction;
pub mod error;
pub mod frustum;
pub mod material;
pub mod math;
pub mod types;

pub use config::RuntimeConfig;
pub use direction::{Face, FaceMask};
pub use error::ConfigError;
pub use frustum::{Aabb, Frustum, Plane};
pub use material::{MaterialRecord, MaterialTable};
pub use types::{ChunkRecord, LodLevel, Orientation, VoxelRecord};
