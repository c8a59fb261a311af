use crate::instance::MeshInstance;
use roomgame_core::types::{BuildState, MeshId};

/// One instanced mesh and its instance buffer.
///
/// Slots are handed out from a free stack and zeroed on release, so an
/// `InstanceBufferRange` held by a cell stays valid until it is removed.
pub struct RoomSegmentMesh {
    id: MeshId,
    name: String,
    /// Build states this mesh was registered for.
    types: Vec<BuildState>,
    instances: Vec<MeshInstance>,
    live: Vec<bool>,
    free_slots: Vec<u32>,
    /// Expected peak instance count, used to size the GPU buffer.
    capacity_hint: u32,
    dirty: bool,
    gpu_buffer: Option<wgpu::Buffer>,
    gpu_capacity: u32,
}

impl RoomSegmentMesh {
    pub fn new(id: MeshId, name: &str, types: Vec<BuildState>, capacity_hint: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            types,
            instances: Vec::with_capacity(capacity_hint as usize),
            live: Vec::with_capacity(capacity_hint as usize),
            free_slots: Vec::new(),
            capacity_hint,
            dirty: false,
            gpu_buffer: None,
            gpu_capacity: 0,
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[BuildState] {
        &self.types
    }

    pub(crate) fn add_type(&mut self, state: BuildState) {
        if !self.types.contains(&state) {
            self.types.push(state);
        }
    }

    pub fn capacity_hint(&self) -> u32 {
        self.capacity_hint
    }

    /// Reserve a slot and write `instance` into it. Returns the slot offset.
    pub fn add_instance(&mut self, instance: MeshInstance) -> u32 {
        self.dirty = true;
        if let Some(slot) = self.free_slots.pop() {
            self.instances[slot as usize] = instance;
            self.live[slot as usize] = true;
            return slot;
        }
        self.instances.push(instance);
        self.live.push(true);
        (self.instances.len() - 1) as u32
    }

    /// Release a slot. Returns false for an unknown or already free slot.
    pub fn remove_instance(&mut self, offset: u32) -> bool {
        match self.live.get_mut(offset as usize) {
            Some(live) if *live => {
                *live = false;
                self.instances[offset as usize] = MeshInstance::default();
                self.free_slots.push(offset);
                self.trim_free_tail();
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Drop free slots at the end of the array so they are not drawn.
    fn trim_free_tail(&mut self) {
        let before = self.live.len();
        while self.live.last() == Some(&false) {
            self.live.pop();
            self.instances.pop();
        }
        if self.live.len() != before {
            let len = self.live.len() as u32;
            self.free_slots.retain(|slot| *slot < len);
        }
    }

    /// Mutate a live slot in place.
    pub fn update_instance(&mut self, offset: u32, f: impl FnOnce(&mut MeshInstance)) -> bool {
        if !self.live.get(offset as usize).copied().unwrap_or(false) {
            return false;
        }
        f(&mut self.instances[offset as usize]);
        self.dirty = true;
        true
    }

    pub fn instance(&self, offset: u32) -> Option<&MeshInstance> {
        if self.live.get(offset as usize).copied().unwrap_or(false) {
            self.instances.get(offset as usize)
        } else {
            None
        }
    }

    pub fn instances(&self) -> &[MeshInstance] {
        &self.instances
    }

    /// Slots to draw: up to the last live slot. Free slots below it are
    /// zero-scale and collapse to nothing in the vertex stage.
    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    pub fn live_count(&self) -> u32 {
        self.live.iter().filter(|l| **l).count() as u32
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the whole instance array (slave side of sync).
    pub(crate) fn replace_instances(&mut self, instances: Vec<MeshInstance>) {
        self.live = instances.iter().map(|i| !i.is_free()).collect();
        self.free_slots = self
            .live
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, l)| !**l)
            .map(|(i, _)| i as u32)
            .collect();
        self.instances = instances;
        self.dirty = true;
    }

    pub fn gpu_buffer(&self) -> Option<&wgpu::Buffer> {
        self.gpu_buffer.as_ref()
    }

    /// Push the instance array to the GPU if it changed. The buffer is
    /// recreated, doubling, when the instance count outgrows it.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        let needed = self.instance_count().max(1);
        if self.gpu_buffer.is_none() || needed > self.gpu_capacity {
            let mut capacity = self.capacity_hint.max(1);
            while capacity < needed {
                capacity *= 2;
            }
            if self.gpu_buffer.is_some() {
                log::info!(
                    "RoomSegmentMesh '{}': growing instance buffer {} -> {}",
                    self.name,
                    self.gpu_capacity,
                    capacity
                );
            }
            self.gpu_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.name.as_str()),
                size: capacity as u64 * std::mem::size_of::<MeshInstance>() as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.gpu_capacity = capacity;
        }
        if let Some(buffer) = &self.gpu_buffer {
            if !self.instances.is_empty() {
                queue.write_buffer(buffer, 0, bytemuck::cast_slice(&self.instances));
            }
        }
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(health: i32) -> MeshInstance {
        MeshInstance {
            scale: 1.0,
            health,
            ..Default::default()
        }
    }

    #[test]
    fn test_slots_are_reused_lifo() {
        let mut mesh = RoomSegmentMesh::new(MeshId(0), "wall", vec![BuildState::WALL_LEFT], 4);
        let a = mesh.add_instance(inst(1));
        let b = mesh.add_instance(inst(2));
        assert_eq!((a, b), (0, 1));
        assert!(mesh.remove_instance(a));
        assert!(mesh.instances()[0].is_free());
        assert_eq!(mesh.add_instance(inst(3)), 0);
        assert_eq!(mesh.instance(0).unwrap().health, 3);
        assert_eq!(mesh.live_count(), 2);
    }

    #[test]
    fn test_double_remove_rejected() {
        let mut mesh = RoomSegmentMesh::new(MeshId(0), "floor", vec![BuildState::INSIDE_ROOM], 4);
        let a = mesh.add_instance(inst(1));
        assert!(mesh.remove_instance(a));
        assert!(!mesh.remove_instance(a));
        assert!(!mesh.remove_instance(99));
        assert!(mesh.instance(a).is_none());
    }

    #[test]
    fn test_update_instance_only_live() {
        let mut mesh = RoomSegmentMesh::new(MeshId(0), "floor", vec![BuildState::INSIDE_ROOM], 4);
        let a = mesh.add_instance(inst(1));
        assert!(mesh.update_instance(a, |i| i.health = 9));
        assert_eq!(mesh.instance(a).unwrap().health, 9);
        mesh.remove_instance(a);
        assert!(!mesh.update_instance(a, |i| i.health = 5));
    }

    #[test]
    fn test_freed_tail_is_not_drawn() {
        let mut mesh = RoomSegmentMesh::new(MeshId(0), "wall", vec![BuildState::WALL_LEFT], 4);
        let slots: Vec<u32> = (0..4).map(|h| mesh.add_instance(inst(h))).collect();
        mesh.remove_instance(slots[1]);
        assert_eq!(mesh.instance_count(), 4);
        mesh.remove_instance(slots[3]);
        mesh.remove_instance(slots[2]);
        // Slots 3, 2 and the free 1 below them all drop off the end.
        assert_eq!(mesh.instance_count(), 1);
        assert_eq!(mesh.live_count(), 1);
        assert_eq!(mesh.add_instance(inst(7)), 1);
        assert_eq!(mesh.instance_count(), 2);
    }

    #[test]
    fn test_add_remove_cycles_do_not_grow_draw_count() {
        let mut mesh = RoomSegmentMesh::new(MeshId(0), "floor", vec![BuildState::INSIDE_ROOM], 4);
        mesh.add_instance(inst(1));
        for _ in 0..50 {
            let a = mesh.add_instance(inst(2));
            let b = mesh.add_instance(inst(3));
            mesh.remove_instance(a);
            mesh.remove_instance(b);
        }
        assert_eq!(mesh.instance_count(), 1);
    }

    #[test]
    fn test_replace_rebuilds_free_list() {
        let mut mesh = RoomSegmentMesh::new(MeshId(0), "floor", vec![BuildState::INSIDE_ROOM], 4);
        mesh.replace_instances(vec![inst(1), MeshInstance::default(), inst(3)]);
        assert_eq!(mesh.live_count(), 2);
        assert_eq!(mesh.add_instance(inst(4)), 1);
        assert_eq!(mesh.add_instance(inst(5)), 3);
    }
}
