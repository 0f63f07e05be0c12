use super::RenderContext;

// ── Mesh ──────────────────────────────────────────────────────────────────────

/// A growable vertex/index buffer pair on the GPU.
///
/// `update` re-uploads both arrays; the underlying buffers are reallocated
/// only when the new data exceeds the current capacity (next power of two,
/// so per-frame text rebuilds settle quickly into a steady allocation).
pub struct Mesh {
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    /// Capacities in bytes.
    vertex_capacity: u64,
    index_capacity: u64,
    index_count: u32,
    label: &'static str,
}

impl Mesh {
    pub fn new(label: &'static str) -> Self {
        Self {
            vertex_buffer: None,
            index_buffer: None,
            vertex_capacity: 0,
            index_capacity: 0,
            index_count: 0,
            label,
        }
    }

    /// Create a mesh and upload `vertices`/`indices` immediately.
    pub fn with_data<V: bytemuck::Pod>(
        ctx: &RenderContext,
        label: &'static str,
        vertices: &[V],
        indices: &[u32],
    ) -> Self {
        let mut mesh = Self::new(label);
        mesh.update(ctx, vertices, indices);
        mesh
    }

    /// Number of indices uploaded by the last `update`.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Upload new vertex and index data, growing the buffers if needed.
    pub fn update<V: bytemuck::Pod>(&mut self, ctx: &RenderContext, vertices: &[V], indices: &[u32]) {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);

        self.index_count = indices.len() as u32;
        if vertices.is_empty() {
            return;
        }

        if vertex_bytes.len() as u64 > self.vertex_capacity || self.vertex_buffer.is_none() {
            let capacity = (vertex_bytes.len() as u64).next_power_of_two().max(1024);
            self.vertex_buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.vertex_capacity = capacity;
        }
        if index_bytes.len() as u64 > self.index_capacity || self.index_buffer.is_none() {
            let capacity = (index_bytes.len() as u64).next_power_of_two().max(1024);
            self.index_buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: capacity,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.index_capacity = capacity;
        }

        ctx.queue.write_buffer(self.vertex_buffer.as_ref().unwrap(), 0, vertex_bytes);
        ctx.queue.write_buffer(self.index_buffer.as_ref().unwrap(), 0, index_bytes);
    }

    /// Bind the buffers on `pass`.  Returns `false` (and binds nothing) when
    /// no data has ever been uploaded — callers skip the draw in that case.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        let (Some(vb), Some(ib)) = (&self.vertex_buffer, &self.index_buffer) else {
            return false;
        };
        pass.set_vertex_buffer(0, vb.slice(..));
        pass.set_index_buffer(ib.slice(..), wgpu::IndexFormat::Uint32);
        true
    }
}
