use roomgame_core::types::BuildState;
use roomgame_grid::CellPlacement;

/// Per-instance vertex data for a room segment mesh.
/// A zeroed record (scale 0) is an invisible free slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshInstance {
    pub translation: [f32; 3],
    pub scale: f32,
    pub build_state: u32,
    pub health: i32,
    pub _pad: [u32; 2],
}

impl MeshInstance {
    pub fn new(placement: CellPlacement, state: BuildState, health: i32) -> Self {
        Self {
            translation: placement.center.to_array(),
            scale: placement.scale,
            build_state: state.bits(),
            health,
            _pad: [0; 2],
        }
    }

    pub fn is_free(&self) -> bool {
        self.scale == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_instance_size() {
        assert_eq!(std::mem::size_of::<MeshInstance>(), 32);
    }

    #[test]
    fn test_new_copies_placement() {
        let placement = CellPlacement {
            center: Vec3::new(0.5, -0.25, 0.0),
            scale: 0.1,
        };
        let inst = MeshInstance::new(placement, BuildState::WALL_TOP, 70);
        assert_eq!(inst.translation, [0.5, -0.25, 0.0]);
        assert_eq!(inst.scale, 0.1);
        assert_eq!(inst.build_state, BuildState::WALL_TOP.bits());
        assert_eq!(inst.health, 70);
        assert!(!inst.is_free());
        assert!(MeshInstance::default().is_free());
    }
}
