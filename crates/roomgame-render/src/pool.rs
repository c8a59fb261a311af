use crate::instance::MeshInstance;
use crate::mesh::RoomSegmentMesh;
use crate::uniforms::{FrameUniforms, UniformBlock, UniformValue};
use roomgame_core::error::{RoomgameError, SyncError};
use roomgame_core::rng::cell_hash;
use roomgame_core::sync::{SharedState, SyncDecoder, SyncEncoder};
use roomgame_core::types::{BuildState, InstanceBufferRange, MeshId};

type UniformUpdate = Box<dyn FnMut(&FrameUniforms) -> UniformValue>;

/// One instanced draw of a room segment mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub mesh: MeshId,
    pub name: String,
    pub instance_count: u32,
    pub depth_pass: bool,
    pub debug: bool,
}

/// Maps build states to instanced meshes and owns their instance buffers.
///
/// A cell whose state contains a registered state (all of its bits) gets
/// one instance in one of the meshes registered for it.
pub struct RoomSegmentMeshPool {
    meshes: Vec<RoomSegmentMesh>,
    /// Registered state and the mesh variations drawn for it.
    registry: Vec<(BuildState, Vec<MeshId>)>,
    shader_name: String,
    uniform_updates: Vec<(String, UniformUpdate)>,
    uniform_values: Vec<(String, UniformValue)>,
    /// Upper bound on instances of any single mesh (one per cell).
    max_instances: u32,
}

impl RoomSegmentMeshPool {
    pub fn new(shader_name: &str, max_instances: u32) -> Self {
        Self {
            meshes: Vec::new(),
            registry: Vec::new(),
            shader_name: shader_name.to_string(),
            uniform_updates: Vec::new(),
            uniform_values: Vec::new(),
            max_instances,
        }
    }

    pub fn shader_name(&self) -> &str {
        &self.shader_name
    }

    /// Expected peak instance count for a mesh drawn for `types`.
    fn estimate_capacity(&self, types: &[BuildState]) -> u32 {
        let max = self.max_instances.max(1);
        let has = |bits: BuildState| types.iter().any(|t| t.intersects(bits));
        if has(BuildState::OUTER_INFLUENCE) {
            1
        } else if has(BuildState::CORNER | BuildState::INVALID) {
            (max / 4).max(4)
        } else if has(BuildState::WALL) {
            (max / 2).max(4)
        } else if has(BuildState::INSIDE_ROOM) {
            max
        } else {
            (max / 4).max(1)
        }
    }

    /// Register one mesh for every state in `types`.
    pub fn add_mesh(&mut self, types: &[BuildState], name: &str) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        let capacity = self.estimate_capacity(types);
        log::info!(
            "RoomSegmentMeshPool: mesh '{}' for {} states, {} instance slots",
            name,
            types.len(),
            capacity
        );
        self.meshes
            .push(RoomSegmentMesh::new(id, name, types.to_vec(), capacity));
        for &state in types {
            match self.registry.iter_mut().find(|(s, _)| *s == state) {
                Some((_, ids)) => ids.push(id),
                None => self.registry.push((state, vec![id])),
            }
        }
        id
    }

    /// Register several interchangeable meshes for the same states.
    pub fn add_mesh_variations(&mut self, types: &[BuildState], names: &[&str]) -> Vec<MeshId> {
        names.iter().map(|name| self.add_mesh(types, name)).collect()
    }

    /// Also draw an already registered mesh for `state`.
    pub fn register_state(&mut self, mesh: MeshId, state: BuildState) -> Result<(), RoomgameError> {
        let target = self
            .meshes
            .get_mut(mesh.0 as usize)
            .ok_or_else(|| RoomgameError::UnknownMesh(format!("{mesh:?}")))?;
        target.add_type(state);
        match self.registry.iter_mut().find(|(s, _)| *s == state) {
            Some((_, ids)) if !ids.contains(&mesh) => ids.push(mesh),
            Some(_) => {}
            None => self.registry.push((state, vec![mesh])),
        }
        Ok(())
    }

    /// Call `f` for every registered non-empty state fully contained in `mask`.
    pub fn filter(&self, mask: BuildState, mut f: impl FnMut(BuildState, &[MeshId])) {
        for (state, ids) in &self.registry {
            if !state.is_empty() && mask.contains(*state) && !ids.is_empty() {
                f(*state, ids);
            }
        }
    }

    /// One mesh per matching registered state; variations are chosen by `seed`.
    pub fn select_meshes(&self, mask: BuildState, seed: (u32, u32)) -> Vec<MeshId> {
        let mut out = Vec::new();
        self.filter(mask, |state, ids| {
            let pick = cell_hash(seed.0, seed.1, state.bits()) as usize % ids.len();
            out.push(ids[pick]);
        });
        out
    }

    pub fn mesh(&self, id: MeshId) -> Option<&RoomSegmentMesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn mesh_by_name(&self, name: &str) -> Option<&RoomSegmentMesh> {
        self.meshes.iter().find(|m| m.name() == name)
    }

    pub fn meshes(&self) -> &[RoomSegmentMesh] {
        &self.meshes
    }

    pub fn add_instance(&mut self, mesh: MeshId, instance: MeshInstance) -> Option<InstanceBufferRange> {
        let target = self.meshes.get_mut(mesh.0 as usize)?;
        let offset = target.add_instance(instance);
        Some(InstanceBufferRange { mesh, offset })
    }

    pub fn remove_instance(&mut self, range: InstanceBufferRange) -> bool {
        self.meshes
            .get_mut(range.mesh.0 as usize)
            .is_some_and(|m| m.remove_instance(range.offset))
    }

    pub fn update_instance(
        &mut self,
        range: InstanceBufferRange,
        f: impl FnOnce(&mut MeshInstance),
    ) -> bool {
        self.meshes
            .get_mut(range.mesh.0 as usize)
            .is_some_and(|m| m.update_instance(range.offset, f))
    }

    pub fn instance(&self, range: InstanceBufferRange) -> Option<&MeshInstance> {
        self.mesh(range.mesh)?.instance(range.offset)
    }

    pub fn live_instance_count(&self) -> u32 {
        self.meshes.iter().map(|m| m.live_count()).sum()
    }

    /// Register a callback evaluated once per frame for uniform `name`.
    /// A second registration for the same name replaces the first.
    pub fn update_uniform_every_frame(
        &mut self,
        name: &str,
        f: impl FnMut(&FrameUniforms) -> UniformValue + 'static,
    ) {
        self.uniform_updates.retain(|(n, _)| n != name);
        self.uniform_updates.push((name.to_string(), Box::new(f)));
    }

    /// Run every uniform callback against this frame's values.
    pub fn update_uniforms(&mut self, frame: &FrameUniforms) {
        self.uniform_values.clear();
        for (name, update) in &mut self.uniform_updates {
            self.uniform_values.push((name.clone(), update(frame)));
        }
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniform_values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn uniform_block(&self) -> UniformBlock {
        UniformBlock::from_values(self.uniform_values.iter().map(|(n, v)| (n.as_str(), *v)))
    }

    /// Draw calls for every mesh with instances. Meshes registered for a
    /// state intersecting `except` are skipped.
    pub fn draw_list(&self, except: BuildState, depth_pass: bool, debug: bool) -> Vec<DrawCall> {
        self.meshes
            .iter()
            .filter(|m| m.instance_count() > 0)
            .filter(|m| except.is_empty() || !m.types().iter().any(|t| t.intersects(except)))
            .map(|m| DrawCall {
                mesh: m.id(),
                name: m.name().to_string(),
                instance_count: m.instance_count(),
                depth_pass,
                debug,
            })
            .collect()
    }

    /// Upload every changed instance buffer.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        for mesh in &mut self.meshes {
            mesh.upload(device, queue);
        }
    }
}

impl SharedState for RoomSegmentMeshPool {
    fn encode(&self, encoder: &mut SyncEncoder) {
        encoder.write_u32(self.meshes.len() as u32);
        for mesh in &self.meshes {
            encoder.write_pod_slice(mesh.instances());
        }
    }

    fn decode(&mut self, decoder: &mut SyncDecoder<'_>) -> Result<(), SyncError> {
        let count = decoder.read_u32()? as usize;
        if count != self.meshes.len() {
            return Err(SyncError::LengthMismatch {
                what: "meshes",
                expected: self.meshes.len(),
                actual: count,
            });
        }
        for mesh in &mut self.meshes {
            let instances: Vec<MeshInstance> = decoder.read_pod_vec()?;
            mesh.replace_instances(instances);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::names;
    use glam::{UVec2, Vec3};

    fn pool() -> RoomSegmentMeshPool {
        let mut pool = RoomSegmentMeshPool::new("room_segment", 64 * 64);
        pool.add_mesh(&[BuildState::INSIDE_ROOM], "floor");
        pool.add_mesh(
            &[
                BuildState::LEFT_LOWER_CORNER,
                BuildState::LEFT_UPPER_CORNER,
                BuildState::RIGHT_LOWER_CORNER,
                BuildState::RIGHT_UPPER_CORNER,
                BuildState::INVALID,
            ],
            "corner",
        );
        pool.add_mesh(
            &[
                BuildState::WALL_LEFT,
                BuildState::WALL_RIGHT,
                BuildState::WALL_TOP,
                BuildState::WALL_BOTTOM,
            ],
            "wall",
        );
        pool.add_mesh(&[BuildState::INSIDE_ROOM_INFECTED], "latticeplane");
        pool.add_mesh(&[BuildState::OUTER_INFLUENCE], "outer_influence");
        pool
    }

    fn names_for(pool: &RoomSegmentMeshPool, mask: BuildState) -> Vec<String> {
        let mut out = Vec::new();
        pool.filter(mask, |_, ids| {
            for id in ids {
                out.push(pool.mesh(*id).unwrap().name().to_string());
            }
        });
        out
    }

    #[test]
    fn test_filter_matches_contained_states() {
        let p = pool();
        assert_eq!(names_for(&p, BuildState::WALL_LEFT), vec!["wall"]);
        assert_eq!(
            names_for(&p, BuildState::INSIDE_ROOM | BuildState::INFECTED),
            vec!["floor", "latticeplane"]
        );
        assert_eq!(
            names_for(&p, BuildState::LEFT_LOWER_CORNER | BuildState::INVALID | BuildState::TEMPORARY),
            vec!["corner", "corner"]
        );
        assert!(names_for(&p, BuildState::EMPTY).is_empty());
        assert!(names_for(&p, BuildState::SOURCE).is_empty());
    }

    #[test]
    fn test_variation_choice_is_deterministic() {
        let mut p = RoomSegmentMeshPool::new("room_segment", 16);
        let ids = p.add_mesh_variations(&[BuildState::INSIDE_ROOM], &["floor_a", "floor_b", "floor_c"]);
        assert_eq!(ids.len(), 3);
        let a = p.select_meshes(BuildState::INSIDE_ROOM, (3, 4));
        let b = p.select_meshes(BuildState::INSIDE_ROOM, (3, 4));
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert!(ids.contains(&a[0]));
    }

    #[test]
    fn test_per_type_capacity() {
        let p = pool();
        let cap = |name: &str| p.mesh_by_name(name).unwrap().capacity_hint();
        assert_eq!(cap("floor"), 4096);
        assert_eq!(cap("wall"), 2048);
        assert_eq!(cap("corner"), 1024);
        assert_eq!(cap("outer_influence"), 1);
    }

    #[test]
    fn test_register_state_unknown_mesh() {
        let mut p = pool();
        assert!(p.register_state(MeshId(99), BuildState::SOURCE).is_err());
        let floor = p.mesh_by_name("floor").unwrap().id();
        p.register_state(floor, BuildState::SOURCE).unwrap();
        assert_eq!(names_for(&p, BuildState::SOURCE), vec!["floor"]);
    }

    #[test]
    fn test_draw_list_skips_empty_and_excluded() {
        let mut p = pool();
        let outer = p.mesh_by_name("outer_influence").unwrap().id();
        let wall = p.mesh_by_name("wall").unwrap().id();
        let inst = MeshInstance {
            scale: 1.0,
            ..Default::default()
        };
        p.add_instance(outer, inst).unwrap();
        p.add_instance(wall, inst).unwrap();

        let all = p.draw_list(BuildState::EMPTY, false, false);
        assert_eq!(all.len(), 2);
        let shadow = p.draw_list(BuildState::OUTER_INFLUENCE, true, false);
        assert_eq!(shadow.len(), 1);
        assert_eq!(shadow[0].name, "wall");
        assert!(shadow[0].depth_pass);
    }

    #[test]
    fn test_uniform_callbacks_once_per_frame() {
        let mut p = pool();
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = calls.clone();
        p.update_uniform_every_frame(names::TIME, move |f| {
            counter.set(counter.get() + 1);
            UniformValue::Float(f.time)
        });
        p.update_uniform_every_frame(names::GRID_DIMENSIONS, |f| UniformValue::UVec2(f.grid_dimensions));
        let frame = FrameUniforms {
            time: 1.25,
            automaton_time_delta: 0.5,
            grid_dimensions: UVec2::new(64, 64),
            grid_translation: Vec3::ZERO,
            grid_cell_size: 2.0 / 64.0,
        };
        p.update_uniforms(&frame);
        p.update_uniforms(&frame);
        assert_eq!(calls.get(), 2);
        assert_eq!(p.uniform(names::TIME), Some(UniformValue::Float(1.25)));
        assert_eq!(p.uniform_block().grid_dimensions, [64, 64]);
        assert_eq!(p.uniform("missing"), None);
    }

    #[test]
    fn test_sync_copies_instances() {
        let mut master = pool();
        let wall = master.mesh_by_name("wall").unwrap().id();
        let inst = MeshInstance {
            scale: 0.5,
            health: 80,
            ..Default::default()
        };
        let range = master.add_instance(wall, inst).unwrap();
        let mut enc = SyncEncoder::new();
        master.encode(&mut enc);
        let bytes = enc.into_bytes();

        let mut slave = pool();
        slave.decode(&mut SyncDecoder::new(&bytes)).unwrap();
        assert_eq!(slave.instance(range).unwrap().health, 80);
        assert_eq!(slave.live_instance_count(), 1);
    }
}
