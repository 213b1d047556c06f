use glam::{Mat4, Vec3};

use crate::error::BackendError;

/// Named structured buffers the renderer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferBinding {
    Voxels,
    Materials,
    Chunks,
}

impl BufferBinding {
    pub const ALL: [BufferBinding; 3] = [
        BufferBinding::Voxels,
        BufferBinding::Materials,
        BufferBinding::Chunks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BufferBinding::Voxels => "Buffer",
            BufferBinding::Materials => "MaterialBuffer",
            BufferBinding::Chunks => "ChunkBuffer",
        }
    }
}

/// Reject buffers whose size is not a whole number of elements.
pub fn check_stride(binding: BufferBinding, len: usize, stride: usize) -> Result<(), BackendError> {
    if stride == 0 || len % stride != 0 {
        return Err(BackendError::InvalidStride {
            binding: binding.name(),
            len,
            stride,
        });
    }
    Ok(())
}

pub const INITIAL_BURST_COUNT: &str = "InitialBurstCount";
pub const DEBUG_LOD: &str = "DebugLod";
pub const EXPOSURE_WEIGHT: &str = "ExposureWeight";

/// The instancing renderer. It consumes opaque structured blobs and named
/// values, then draws on [`play`](RenderBackend::play).
pub trait RenderBackend {
    /// Replace the buffer bound to `binding`. Any previous buffer for the
    /// binding is released first.
    fn set_structured_buffer(
        &mut self,
        binding: BufferBinding,
        data: &[u8],
        stride: usize,
    ) -> Result<(), BackendError>;

    /// Select the instance capacity the draw is sized for.
    fn set_capacity(&mut self, capacity: u32);

    fn set_int(&mut self, name: &str, value: i32);
    fn set_float(&mut self, name: &str, value: f32);
    fn set_bool(&mut self, name: &str, value: bool);

    fn play(&mut self);

    /// Release every bound buffer. Calling it twice is harmless.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceMesh {
    Cube,
    Quad,
}

pub type InstanceHandle = u64;

/// Instanced ray-tracing acceleration structure with handle-based updates.
pub trait AccelerationStructure {
    /// Add a batch of instances sharing one material and mesh. Batches never
    /// exceed the per-call capacity.
    fn add_instances(
        &mut self,
        material: u8,
        mesh: InstanceMesh,
        transforms: &[Mat4],
    ) -> Result<InstanceHandle, BackendError>;

    fn remove_instances(&mut self, handle: InstanceHandle);

    fn build(&mut self, origin: Vec3);

    fn clear(&mut self);
}
