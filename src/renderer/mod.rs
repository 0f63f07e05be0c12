pub mod deferred;
pub mod font;
pub mod generators;
pub mod mesh;
pub mod packer;
pub mod sdf;
pub mod target;
pub mod text;
pub mod texture;
pub mod utils;

use std::collections::HashMap;
use std::sync::Arc;

// ── RenderContext ─────────────────────────────────────────────────────────────

/// GPU device, queue and the name-keyed pipeline registry.
///
/// Components that share a pipeline (the font shader, the debug quad blit,
/// the deferred passes) fetch it here by name; the first fetch creates it,
/// every later fetch reuses the cached object.  Passing the context
/// explicitly keeps the "link once, reuse everywhere" behaviour without any
/// process-wide state, and the registry needs no locking because the engine
/// renders from a single thread.
pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of the final color target (the window surface).
    pub surface_format: wgpu::TextureFormat,
    render_pipelines: HashMap<&'static str, Arc<wgpu::RenderPipeline>>,
    compute_pipelines: HashMap<&'static str, Arc<wgpu::ComputePipeline>>,
}

impl RenderContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            queue,
            surface_format,
            render_pipelines: HashMap::new(),
            compute_pipelines: HashMap::new(),
        }
    }

    /// Fetch the render pipeline registered under `name`, creating it on
    /// first use.
    pub fn render_pipeline(
        &mut self,
        name: &'static str,
        create: impl FnOnce(&wgpu::Device, wgpu::TextureFormat) -> wgpu::RenderPipeline,
    ) -> Arc<wgpu::RenderPipeline> {
        let device = &self.device;
        let format = self.surface_format;
        self.render_pipelines
            .entry(name)
            .or_insert_with(|| Arc::new(create(device, format)))
            .clone()
    }

    /// Fetch the compute pipeline registered under `name`, creating it on
    /// first use.
    pub fn compute_pipeline(
        &mut self,
        name: &'static str,
        create: impl FnOnce(&wgpu::Device) -> wgpu::ComputePipeline,
    ) -> Arc<wgpu::ComputePipeline> {
        let device = &self.device;
        self.compute_pipelines
            .entry(name)
            .or_insert_with(|| Arc::new(create(device)))
            .clone()
    }

    pub fn has_render_pipeline(&self, name: &str) -> bool {
        self.render_pipelines.contains_key(name)
    }
}

// ── UniformArena ──────────────────────────────────────────────────────────────

/// A uniform buffer sliced into 256-byte slots addressed by dynamic offset.
///
/// Per-model and per-light data is written into consecutive slots each frame
/// and bound once with a per-draw offset — one buffer, one bind group, many
/// draws.  `ensure` reports reallocation so owners can rebuild the bind
/// group that references the buffer.
pub(crate) struct UniformArena {
    pub buffer: wgpu::Buffer,
    capacity: u32,
    label: &'static str,
}

impl UniformArena {
    /// Matches wgpu's default `min_uniform_buffer_offset_alignment`.
    pub const STRIDE: u32 = 256;

    pub fn new(device: &wgpu::Device, label: &'static str, capacity: u32) -> Self {
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64 * Self::STRIDE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer, capacity, label }
    }

    /// Grow to hold at least `slots` entries.  Returns `true` when the
    /// buffer was reallocated (bind groups referencing it are stale).
    pub fn ensure(&mut self, device: &wgpu::Device, slots: u32) -> bool {
        if slots <= self.capacity {
            return false;
        }
        *self = Self::new(device, self.label, slots.next_power_of_two());
        true
    }

    pub fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, slot: u32, value: &T) {
        debug_assert!(slot < self.capacity);
        queue.write_buffer(
            &self.buffer,
            slot as u64 * Self::STRIDE as u64,
            bytemuck::bytes_of(value),
        );
    }

    pub fn offset(slot: u32) -> u32 {
        slot * Self::STRIDE
    }

    /// Binding resource covering one slot (bound with a dynamic offset).
    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(Self::STRIDE as u64),
        })
    }
}
