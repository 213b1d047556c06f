use std::time::Instant;

use glam::{Quat, Vec3};
use voxvfx_core::config::RuntimeConfig;
use voxvfx_render::{
    build_catalog, BackendError, ChunkCatalog, HeadlessBackend, Observer, RenderBackend,
    VoxRuntime, WgpuBackend,
};
use voxvfx_world::{CancelToken, ImportSession, WorldData};

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("import of {0} produced no scene")]
    ImportFailed(String),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    Device(String),
}

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub voxel_count: usize,
    pub dropped_voxels: usize,
    pub loaded_slots: usize,
    pub catalog_voxels: usize,
    pub active_slots: usize,
    pub active_voxels: usize,
    pub import_ms: f64,
    pub lod_ms: f64,
    pub iterations: u32,
    /// Select + assemble + upload against the headless backend.
    pub refresh: TimingSeries,
    /// Same pass against the GPU backend, when one was requested.
    pub gpu_refresh: Option<TimingSeries>,
}

/// Imports scenes and times each stage of the pipeline.
pub struct BenchmarkRunner {
    config: RuntimeConfig,
    iterations: u32,
    gpu: Option<WgpuBackend>,
}

impl BenchmarkRunner {
    pub fn new(config: RuntimeConfig, iterations: u32) -> Self {
        Self {
            config,
            iterations: iterations.max(1),
            gpu: None,
        }
    }

    /// Initialize wgpu natively for the GPU refresh pass. Blocks on the
    /// async adapter request.
    pub fn with_gpu(mut self) -> Result<Self, BenchError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(BenchError::NoAdapter)?;

        log::info!("Benchmark adapter: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("bench-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| BenchError::Device(e.to_string()))?;

        self.gpu = Some(WgpuBackend::new(device, queue));
        Ok(self)
    }

    /// Import `bytes`, build the catalog and time repeated refreshes from an
    /// observer orbiting the world centre at `camera_offset`.
    pub fn run_bytes(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        camera_offset: Vec3,
    ) -> Result<BenchmarkResult, BenchError> {
        log::info!("Running scene '{name}' ({} bytes)...", bytes.len());

        let start = Instant::now();
        let scene = ImportSession::new(bytes, CancelToken::new())
            .run()
            .ok_or_else(|| BenchError::ImportFailed(name.to_string()))?;
        let import_ms = elapsed_ms(start);
        let world = scene.world;

        let start = Instant::now();
        let catalog = build_catalog(&world);
        let lod_ms = elapsed_ms(start);
        log::info!(
            "  Imported {} voxels, {} slots in {:.1}ms + {:.1}ms",
            world.voxel_count(),
            catalog.loaded_slots(),
            import_ms,
            lod_ms
        );

        let mut runtime = self.runtime(HeadlessBackend::default(), &world, catalog.clone())?;
        let refresh = self.time_refreshes(&mut runtime, camera_offset, |_| {})?;
        let active_slots = runtime.active_slots().len();
        let active_voxels = runtime
            .active_slots()
            .iter()
            .map(|&slot| runtime.catalog().payload(slot).len())
            .sum();

        let gpu_refresh = match self.gpu.take() {
            Some(backend) => {
                let mut runtime = self.runtime(backend, &world, catalog.clone())?;
                let timings = self.time_refreshes(&mut runtime, camera_offset, |backend| {
                    backend.device().poll(wgpu::Maintain::Wait);
                });
                self.gpu = Some(runtime.into_backend());
                Some(timings?)
            }
            None => None,
        };

        log::info!(
            "  Done: mean={:.2}ms, p95={:.2}ms, p99={:.2}ms",
            refresh.mean_ms,
            refresh.p95_ms,
            refresh.p99_ms
        );

        Ok(BenchmarkResult {
            scene_name: name.to_string(),
            voxel_count: world.voxel_count(),
            dropped_voxels: world.dropped_count(),
            loaded_slots: catalog.loaded_slots(),
            catalog_voxels: catalog.total_voxels(),
            active_slots,
            active_voxels,
            import_ms,
            lod_ms,
            iterations: self.iterations,
            refresh,
            gpu_refresh,
        })
    }

    fn runtime<B: RenderBackend>(
        &self,
        backend: B,
        world: &WorldData,
        catalog: ChunkCatalog,
    ) -> Result<VoxRuntime<B>, BenchError> {
        let mut runtime = VoxRuntime::new(backend, self.config.clone());
        runtime.set_materials(*world.materials())?;
        runtime.set_world_bounds(world.bounds());
        runtime.load_catalog(catalog)?;
        Ok(runtime)
    }

    fn time_refreshes<B: RenderBackend>(
        &self,
        runtime: &mut VoxRuntime<B>,
        camera_offset: Vec3,
        mut wait: impl FnMut(&B),
    ) -> Result<TimingSeries, BenchError> {
        let target = runtime.spawn_position();
        let mut frame_times = Vec::with_capacity(self.iterations as usize);
        for i in 0..self.iterations {
            let angle = i as f32 / self.iterations as f32 * std::f32::consts::TAU;
            let observer = orbit_observer(target, camera_offset, angle);

            let frame_start = Instant::now();
            runtime.refresh(&observer)?;
            wait(runtime.backend());
            frame_times.push(elapsed_ms(frame_start));
        }
        Ok(compute_timings(&frame_times))
    }
}

/// Observer at `offset` from `target`, rotated `angle` radians around the
/// vertical axis, looking at `target`.
pub fn orbit_observer(target: Vec3, offset: Vec3, angle: f32) -> Observer {
    let position = target + Quat::from_rotation_y(angle) * offset;
    let forward = (target - position).normalize_or(Vec3::NEG_Z);
    let rotation = Quat::from_rotation_arc(Vec3::NEG_Z, forward);
    Observer::perspective(position, rotation, 60f32.to_radians(), 16.0 / 9.0, 5000.0)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Compute timing statistics from a list of frame times in milliseconds.
fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}
