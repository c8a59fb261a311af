use roomgame_grid::{CellVertex, InteractiveGrid};

/// Vertex buffer with one point per grid cell for the debug render.
pub struct GridDebugBuffer {
    buffer: wgpu::Buffer,
    cell_count: u32,
}

impl GridDebugBuffer {
    pub fn new(device: &wgpu::Device, cell_count: u32) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid-debug-points"),
            size: cell_count as u64 * std::mem::size_of::<CellVertex>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer, cell_count }
    }

    /// Write every changed cell vertex at its cell's offset.
    pub fn upload(&self, queue: &wgpu::Queue, grid: &mut InteractiveGrid) -> usize {
        let dirty = grid.take_dirty_vertices();
        let stride = std::mem::size_of::<CellVertex>() as u64;
        for (index, vertex) in &dirty {
            if *index >= self.cell_count {
                log::warn!("Debug vertex {} outside buffer of {}", index, self.cell_count);
                continue;
            }
            queue.write_buffer(&self.buffer, *index as u64 * stride, bytemuck::bytes_of(vertex));
        }
        dirty.len()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.cell_count
    }
}
