use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::backend::{
    check_stride, BufferBinding, RenderBackend, DEBUG_LOD, EXPOSURE_WEIGHT, INITIAL_BURST_COUNT,
};
use crate::error::BackendError;

/// Named values the draw reads. Must match RenderParams in the instancing
/// shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RenderParams {
    pub initial_burst_count: i32,
    pub capacity: u32,
    pub exposure_weight: f32,
    pub debug_lod: u32,
}

impl RenderParams {
    fn set_int(&mut self, name: &str, value: i32) -> bool {
        match name {
            INITIAL_BURST_COUNT => self.initial_burst_count = value,
            _ => return false,
        }
        true
    }

    fn set_float(&mut self, name: &str, value: f32) -> bool {
        match name {
            EXPOSURE_WEIGHT => self.exposure_weight = value,
            _ => return false,
        }
        true
    }

    fn set_bool(&mut self, name: &str, value: bool) -> bool {
        match name {
            DEBUG_LOD => self.debug_lod = u32::from(value),
            _ => return false,
        }
        true
    }
}

/// GPU storage for the three structured buffers plus the parameter uniform.
///
/// Buffers are immutable once created; replacing a binding destroys the old
/// buffer and creates a new one sized to the data.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: HashMap<BufferBinding, wgpu::Buffer>,
    params: RenderParams,
    params_buffer: wgpu::Buffer,
    frames: u64,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let params = RenderParams::default();
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("render-params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            params,
            params_buffer,
            frames: 0,
        }
    }

    pub fn buffer(&self, binding: BufferBinding) -> Option<&wgpu::Buffer> {
        self.buffers.get(&binding)
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    pub fn params_buffer(&self) -> &wgpu::Buffer {
        &self.params_buffer
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Number of `play` submissions so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn buffer_label(binding: BufferBinding) -> &'static str {
    match binding {
        BufferBinding::Voxels => "voxel-buffer",
        BufferBinding::Materials => "material-buffer",
        BufferBinding::Chunks => "chunk-buffer",
    }
}

impl RenderBackend for WgpuBackend {
    fn set_structured_buffer(
        &mut self,
        binding: BufferBinding,
        data: &[u8],
        stride: usize,
    ) -> Result<(), BackendError> {
        check_stride(binding, data.len(), stride)?;
        if let Some(old) = self.buffers.remove(&binding) {
            log::debug!("releasing {} ({} bytes)", binding.name(), old.size());
            old.destroy();
        }
        // Zero-sized storage bindings are invalid, so an empty upload keeps
        // one zeroed element.
        let padding = vec![0u8; stride];
        let contents = if data.is_empty() { &padding[..] } else { data };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(buffer_label(binding)),
                contents,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
        log::debug!(
            "created {} with {} elements",
            binding.name(),
            data.len() / stride
        );
        self.buffers.insert(binding, buffer);
        Ok(())
    }

    fn set_capacity(&mut self, capacity: u32) {
        self.params.capacity = capacity;
    }

    fn set_int(&mut self, name: &str, value: i32) {
        if !self.params.set_int(name, value) {
            log::warn!("unknown int parameter {name}");
        }
    }

    fn set_float(&mut self, name: &str, value: f32) {
        if !self.params.set_float(name, value) {
            log::warn!("unknown float parameter {name}");
        }
    }

    fn set_bool(&mut self, name: &str, value: bool) {
        if !self.params.set_bool(name, value) {
            log::warn!("unknown bool parameter {name}");
        }
    }

    fn play(&mut self) {
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));
        self.queue.submit(std::iter::empty());
        self.frames += 1;
    }

    fn release(&mut self) {
        for (_, buffer) in self.buffers.drain() {
            buffer.destroy();
        }
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.release();
    }
}
