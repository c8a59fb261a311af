use roomgame_core::automaton::CellularAutomaton;
use roomgame_core::types::CellTexel;

/// GPU copies of the automaton's latest and previous cell states, read by
/// the room segment shader as `gridTex` and `gridTex_PrevState`.
///
/// Both buffers are created once at init; each frame overwrites them.
pub struct GridStateBuffers {
    latest: wgpu::Buffer,
    previous: wgpu::Buffer,
    cell_count: u32,
}

impl GridStateBuffers {
    pub fn new(device: &wgpu::Device, cell_count: u32) -> Self {
        let size = cell_count as u64 * std::mem::size_of::<CellTexel>() as u64;
        let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
        log::info!(
            "GridStateBuffers: {} cells, {} KB per buffer",
            cell_count,
            size / 1024
        );
        let latest = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid-state-latest"),
            size,
            usage,
            mapped_at_creation: false,
        });
        let previous = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grid-state-previous"),
            size,
            usage,
            mapped_at_creation: false,
        });
        Self {
            latest,
            previous,
            cell_count,
        }
    }

    /// Copy both automaton states to the GPU.
    pub fn upload(&self, queue: &wgpu::Queue, automaton: &dyn CellularAutomaton) {
        let latest = automaton.latest_texture();
        let previous = automaton.previous_texture();
        if latest.len() != self.cell_count as usize || previous.len() != self.cell_count as usize {
            log::warn!(
                "GridStateBuffers: automaton has {}/{} cells, expected {}",
                latest.len(),
                previous.len(),
                self.cell_count
            );
            return;
        }
        queue.write_buffer(&self.latest, 0, bytemuck::cast_slice(latest));
        queue.write_buffer(&self.previous, 0, bytemuck::cast_slice(previous));
    }

    pub fn latest(&self) -> &wgpu::Buffer {
        &self.latest
    }

    pub fn previous(&self) -> &wgpu::Buffer {
        &self.previous
    }
}
