use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::backend::{
    check_stride, AccelerationStructure, BufferBinding, InstanceHandle, InstanceMesh,
    RenderBackend,
};
use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq)]
pub struct BoundBuffer {
    pub data: Vec<u8>,
    pub stride: usize,
}

impl BoundBuffer {
    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory backend that keeps whatever it was given. Used by the bench
/// and by tests to inspect uploads.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub buffers: HashMap<BufferBinding, BoundBuffer>,
    pub ints: HashMap<String, i32>,
    pub floats: HashMap<String, f32>,
    pub bools: HashMap<String, bool>,
    pub capacity: u32,
    pub play_count: u32,
    /// Buffers dropped by replacement or release.
    pub released: u32,
}

impl HeadlessBackend {
    pub fn buffer(&self, binding: BufferBinding) -> Option<&BoundBuffer> {
        self.buffers.get(&binding)
    }
}

impl RenderBackend for HeadlessBackend {
    fn set_structured_buffer(
        &mut self,
        binding: BufferBinding,
        data: &[u8],
        stride: usize,
    ) -> Result<(), BackendError> {
        check_stride(binding, data.len(), stride)?;
        if self.buffers.remove(&binding).is_some() {
            self.released += 1;
        }
        self.buffers.insert(
            binding,
            BoundBuffer {
                data: data.to_vec(),
                stride,
            },
        );
        Ok(())
    }

    fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.ints.insert(name.to_string(), value);
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.floats.insert(name.to_string(), value);
    }

    fn set_bool(&mut self, name: &str, value: bool) {
        self.bools.insert(name.to_string(), value);
    }

    fn play(&mut self) {
        self.play_count += 1;
    }

    fn release(&mut self) {
        self.released += self.buffers.len() as u32;
        self.buffers.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub material: u8,
    pub mesh: InstanceMesh,
    pub transforms: Vec<Mat4>,
}

/// Acceleration structure that records calls instead of building anything.
#[derive(Debug, Default)]
pub struct RecordingAccelerationStructure {
    pub live: HashMap<InstanceHandle, RecordedBatch>,
    /// Size of every `add_instances` call, in call order.
    pub add_calls: Vec<usize>,
    pub removed: Vec<InstanceHandle>,
    pub builds: u32,
    /// Keep transforms of live batches. Off for very large batches.
    pub keep_transforms: bool,
    next_handle: InstanceHandle,
}

impl RecordingAccelerationStructure {
    pub fn new() -> Self {
        Self {
            keep_transforms: true,
            ..Default::default()
        }
    }

    pub fn live_instance_count(&self) -> usize {
        self.live.values().map(|b| b.transforms.len()).sum()
    }
}

impl AccelerationStructure for RecordingAccelerationStructure {
    fn add_instances(
        &mut self,
        material: u8,
        mesh: InstanceMesh,
        transforms: &[Mat4],
    ) -> Result<InstanceHandle, BackendError> {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.add_calls.push(transforms.len());
        let transforms = if self.keep_transforms {
            transforms.to_vec()
        } else {
            Vec::new()
        };
        self.live.insert(
            handle,
            RecordedBatch {
                material,
                mesh,
                transforms,
            },
        );
        Ok(handle)
    }

    fn remove_instances(&mut self, handle: InstanceHandle) {
        if self.live.remove(&handle).is_some() {
            self.removed.push(handle);
        }
    }

    fn build(&mut self, _origin: Vec3) {
        self.builds += 1;
    }

    fn clear(&mut self) {
        self.live.clear();
    }
}
