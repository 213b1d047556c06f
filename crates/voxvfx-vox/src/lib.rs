pub mod axis;
pub mod compat;
pub mod cursor;
pub mod error;
pub mod format;
pub mod material;
pub mod model;
pub mod palette;
pub mod reader;
pub mod writer;

pub use cursor::Dict;
pub use error::VoxError;
pub use material::{resolve_materials, MaterialChunk, MaterialKind, MaterialProperties};
pub use model::{GroupNode, ShapeNode, TransformNode, VoxScene, VoxelGrid};
pub use palette::Palette;
pub use reader::{read_scene, ReadStep, VoxReader};
pub use writer::{SceneWriter, WriterModel};
