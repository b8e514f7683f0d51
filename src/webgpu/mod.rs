//! WebGPU (wgpu) GPU backend for df11.
//!
//! Runs the massively parallel decode on the GPU via the cross-platform
//! wgpu library, which supports Vulkan, Metal, DX12, and WebGPU backends.
//!
//! # Feature Gate
//!
//! This module is only available when compiled with the `webgpu` feature:
//! ```bash
//! cargo build --features webgpu
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "webgpu")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use df11::webgpu::WebGpuEngine;
//!
//! let engine = WebGpuEngine::new()?;
//! println!("Using device: {}", engine.device_name());
//!
//! let bundle = df11::encode(&[0x3F80; 1024]);
//! let words = engine.df11_decode(&bundle)?;
//! # Ok(())
//! # }
//! ```

use crate::{Df11Error, Df11Result};

use std::sync::OnceLock;

use wgpu::util::DeviceExt;

mod decode;


/// Embedded WGSL kernel source: per-group DFloat11 decode.
const DF11_DECODE_KERNEL_SOURCE: &str = include_str!("../../kernels/df11_decode.wgsl");

/// Workgroup size of the decode kernel (must match @workgroup_size in
/// df11_decode.wgsl).
pub(crate) const DECODE_WORKGROUP_SIZE: u32 = 64;

/// Information about a discovered WebGPU device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Device vendor string.
    pub vendor: String,
    /// Whether this is a discrete GPU device.
    pub is_gpu: bool,
    /// Maximum workgroup size.
    pub max_work_group_size: usize,
}

/// Probe all available WebGPU devices without creating an engine.
pub fn probe_devices() -> Vec<DeviceInfo> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapters = instance.enumerate_adapters(wgpu::Backends::all());
    adapters
        .into_iter()
        .map(|adapter| {
            let info = adapter.get_info();
            let limits = adapter.limits();
            DeviceInfo {
                name: info.name.clone(),
                vendor: format!("{:?}", info.vendor),
                is_gpu: matches!(
                    info.device_type,
                    wgpu::DeviceType::DiscreteGpu | wgpu::DeviceType::IntegratedGpu
                ),
                max_work_group_size: limits.max_compute_workgroup_size_x as usize,
            }
        })
        .collect()
}

/// Return the number of available WebGPU devices.
pub fn device_count() -> usize {
    probe_devices().len()
}

/// Decode pipeline (1 pipeline from df11_decode.wgsl).
struct Df11Pipelines {
    decode: wgpu::ComputePipeline,
}

/// WebGPU compute engine.
///
/// Manages the wgpu device, queue, and the lazily-compiled decode
/// pipeline. Create one engine at library init time and reuse it across
/// calls. Pipeline compilation is deferred to first use so engine
/// creation stays cheap.
pub struct WebGpuEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    df11: OnceLock<Df11Pipelines>,
    /// Device name for diagnostics.
    device_name: String,
    /// Maximum compute workgroup size.
    max_work_group_size: usize,
    /// Maximum workgroups per dispatch dimension (device-queried, typically 65535).
    max_workgroups_per_dim: u32,
    /// Whether the selected device is a CPU (not GPU).
    is_cpu: bool,
    /// Maximum storage buffer binding size in bytes (device limit).
    max_buffer_size: u32,
    /// Whether wall-clock dispatch timing is printed to stderr.
    profiling: bool,
}

impl std::fmt::Debug for WebGpuEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGpuEngine")
            .field("device_name", &self.device_name)
            .field("max_work_group_size", &self.max_work_group_size)
            .finish_non_exhaustive()
    }
}

impl WebGpuEngine {
    /// Create a new engine, selecting the best available GPU device.
    pub fn new() -> Df11Result<Self> {
        Self::create(true, false)
    }

    /// Create a new engine with explicit GPU preference.
    pub fn with_device_preference(prefer_gpu: bool) -> Df11Result<Self> {
        Self::create(prefer_gpu, false)
    }

    /// Create a new engine that prints per-dispatch wall-clock timings
    /// to stderr.
    pub fn with_profiling(profiling: bool) -> Df11Result<Self> {
        Self::create(true, profiling)
    }

    fn create(prefer_gpu: bool, profiling: bool) -> Df11Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let power_pref = if prefer_gpu {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::None
        };

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power_pref,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .map_err(|e| {
            eprintln!("[df11-gpu] no suitable adapter: {e}");
            Df11Error::Unsupported
        })?;

        let info = adapter.get_info();
        let device_name = info.name.clone();
        let is_cpu = matches!(info.device_type, wgpu::DeviceType::Cpu);

        // Reject software/CPU adapters (e.g. WARP on Windows) when a real GPU
        // was requested — they're too slow for compute workloads and can hang.
        if prefer_gpu && is_cpu {
            return Err(Df11Error::Unsupported);
        }

        let limits = adapter.limits();
        let max_work_group_size = limits.max_compute_workgroup_size_x as usize;
        let max_workgroups_per_dim = limits.max_compute_workgroups_per_dimension;
        let max_buffer_size = limits.max_storage_buffer_binding_size;

        // The decode kernel binds 5 storage buffers, more than the
        // downlevel limit of 4, so request the full default limits.
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("df11-webgpu"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::defaults(),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            eprintln!("[df11-gpu] device request failed on '{device_name}': {e}");
            Df11Error::Unsupported
        })?;

        Ok(WebGpuEngine {
            device,
            queue,
            df11: OnceLock::new(),
            device_name,
            max_work_group_size,
            max_workgroups_per_dim,
            is_cpu,
            max_buffer_size,
            profiling,
        })
    }

    /// Return the name of the selected compute device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Block the host until all submitted GPU work completes.
    pub(crate) fn poll_wait(&self) {
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
    }

    /// Return the maximum work-group size for the device.
    pub fn max_work_group_size(&self) -> usize {
        self.max_work_group_size
    }

    /// Check if the selected device is a CPU (not a GPU or accelerator).
    pub fn is_cpu_device(&self) -> bool {
        self.is_cpu
    }

    /// Whether dispatch timing is enabled on this engine.
    pub fn profiling(&self) -> bool {
        self.profiling
    }

    /// Maximum element count that fits in a single decode dispatch.
    ///
    /// Bounded by the maximum storage buffer binding size (the output
    /// buffer is 2 bytes per element) and the 2D workgroup dispatch
    /// limit on group count.
    pub fn max_dispatch_elements(&self) -> usize {
        self.max_buffer_size as usize / 2
    }

    // --- Helper: create buffer with data ---

    fn create_buffer_init(
        &self,
        label: &str,
        data: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage,
            })
    }

    fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Read a buffer back to the CPU.
    fn read_buffer(&self, buffer: &wgpu::Buffer, size: u64) -> Vec<u8> {
        let staging = self.create_buffer(
            "staging",
            size,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("read_buffer"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .unwrap()
            .map_err(|_| Df11Error::Unsupported)
            .unwrap();

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        data
    }

    /// Compute 2D tiling dimensions for a given workgroup count.
    fn tile_workgroups(&self, workgroups_x: u32) -> Df11Result<(u32, u32)> {
        let max = self.max_workgroups_per_dim;
        if workgroups_x <= max {
            Ok((workgroups_x, 1u32))
        } else {
            let wy = workgroups_x.div_ceil(max);
            if wy > max {
                return Err(Df11Error::Unsupported);
            }
            Ok((max, wy))
        }
    }

    /// Compute the X dispatch width in invocations for 2D tiling.
    /// The kernel uses `gid.x + gid.y * dispatch_width` to linearize.
    fn dispatch_width(&self, workgroups_x: u32, workgroup_size: u32) -> u32 {
        let max = self.max_workgroups_per_dim;
        let wx = if workgroups_x <= max {
            workgroups_x
        } else {
            max
        };
        wx * workgroup_size
    }

    /// Record and immediately submit a single compute dispatch.
    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
        workgroups_x: u32,
        label: &str,
    ) -> Df11Result<()> {
        let t0 = if self.profiling {
            Some(std::time::Instant::now())
        } else {
            None
        };
        let (wx, wy) = self.tile_workgroups(workgroups_x)?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(wx, wy, 1);
        }
        self.queue.submit(Some(encoder.finish()));

        if self.profiling {
            self.poll_wait();
            let ms = t0.unwrap().elapsed().as_secs_f64() * 1000.0;
            eprintln!("[df11-gpu] {label}: {ms:.3} ms");
        }
        Ok(())
    }

    // --- Pad input to u32-aligned for WGSL byte reading ---

    fn pad_input_bytes(input: &[u8]) -> Vec<u8> {
        let mut padded = input.to_vec();
        // Pad to u32-aligned plus 4 extra bytes so the kernel's byte
        // reads never index past the bound array.
        let target = ((input.len() + 3) & !3) + 4;
        padded.resize(target, 0);
        padded
    }

    /// Helper: create a shader module + compute pipeline from WGSL source.
    fn make_pipeline(&self, label: &str, source: &str, entry: &str) -> wgpu::ComputePipeline {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        self.device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            })
    }

    fn pipeline_df11_decode(&self) -> &wgpu::ComputePipeline {
        &self
            .df11
            .get_or_init(|| {
                let t0 = std::time::Instant::now();
                let group = Df11Pipelines {
                    decode: self.make_pipeline(
                        "df11_decode",
                        DF11_DECODE_KERNEL_SOURCE,
                        "df11_decode",
                    ),
                };
                if self.profiling {
                    let ms = t0.elapsed().as_secs_f64() * 1000.0;
                    eprintln!("[df11-gpu] compile df11_decode.wgsl: {ms:.3} ms");
                }
                group
            })
            .decode
    }
}

// ---------------------------------------------------------------------------
// DeviceBuf — data residing on the GPU, not read back unless requested
// ---------------------------------------------------------------------------

/// A buffer residing on the GPU device.
///
/// Data stays on-device until explicitly downloaded via [`read_to_host()`].
/// This avoids the PCI-bus round-trip when the decoded tensor feeds
/// straight into GPU inference on the same device.
///
/// [`read_to_host()`]: DeviceBuf::read_to_host
pub struct DeviceBuf {
    pub(crate) buf: wgpu::Buffer,
    pub(crate) len: usize,
}

impl DeviceBuf {
    /// Upload host data to the GPU, returning a device-resident buffer.
    ///
    /// The data is padded to u32-aligned + 4 bytes (matching WGSL's
    /// `array<u32>` byte reading convention). The `len` field stores the
    /// logical (unpadded) length.
    pub fn from_host(engine: &WebGpuEngine, data: &[u8]) -> Df11Result<Self> {
        if data.is_empty() {
            let buf = engine.create_buffer(
                "device_buf_empty",
                4,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            );
            return Ok(DeviceBuf { buf, len: 0 });
        }

        let padded = WebGpuEngine::pad_input_bytes(data);
        let buf = engine.create_buffer_init(
            "device_buf",
            &padded,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );

        Ok(DeviceBuf {
            buf,
            len: data.len(),
        })
    }

    /// Download the buffer contents from the GPU to host memory.
    pub fn read_to_host(&self, engine: &WebGpuEngine) -> Df11Result<Vec<u8>> {
        if self.len == 0 {
            return Ok(Vec::new());
        }

        // The buffer may be padded, so read the full buffer and truncate.
        let raw = engine.read_buffer(&self.buf, self.buf.size());
        Ok(raw[..self.len].to_vec())
    }

    /// The logical length of the data in this buffer, in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this buffer is empty (zero-length data).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
