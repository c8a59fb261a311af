use glam::Vec2;
use roomgame_core::constants::MAX_HEALTH;
use roomgame_core::direction::Direction;
use roomgame_core::types::{BuildState, CellCoord, InstanceBufferRange};

/// Per-cell record uploaded for the debug point render.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct CellVertex {
    pub position: [f32; 2],
    pub build_state: u32,
    pub health: i32,
}

/// One cell of the interactive grid.
///
/// Identity and neighbour links are fixed at grid construction. The build
/// state only changes through `InteractiveGrid::build_at`.
#[derive(Debug, Clone)]
pub struct GridCell {
    coord: CellCoord,
    /// Lower-left corner in grid-local space.
    position: Vec2,
    pub(crate) build_state: BuildState,
    health: i32,
    neighbors: [Option<CellCoord>; 4],
    instances: Vec<InstanceBufferRange>,
}

impl GridCell {
    pub(crate) fn new(coord: CellCoord, position: Vec2, neighbors: [Option<CellCoord>; 4]) -> Self {
        Self {
            coord,
            position,
            build_state: BuildState::EMPTY,
            health: MAX_HEALTH,
            neighbors,
            instances: Vec::new(),
        }
    }

    pub fn coord(&self) -> CellCoord {
        self.coord
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn build_state(&self) -> BuildState {
        self.build_state
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    /// Set health. Callers outside a state-change hook should go through
    /// `InteractiveGrid::set_health` so the debug vertex is refreshed.
    pub fn set_health(&mut self, health: i32) {
        self.health = health;
    }

    pub fn neighbor(&self, dir: Direction) -> Option<CellCoord> {
        self.neighbors[dir.index()]
    }

    pub fn neighbors(&self) -> &[Option<CellCoord>; 4] {
        &self.neighbors
    }

    pub fn instances(&self) -> &[InstanceBufferRange] {
        &self.instances
    }

    pub fn push_instance(&mut self, range: InstanceBufferRange) {
        self.instances.push(range);
    }

    /// Take every instance range owned by this cell.
    pub fn take_instances(&mut self) -> Vec<InstanceBufferRange> {
        std::mem::take(&mut self.instances)
    }

    pub fn vertex(&self) -> CellVertex {
        CellVertex {
            position: self.position.to_array(),
            build_state: self.build_state.bits(),
            health: self.health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_vertex_size() {
        assert_eq!(std::mem::size_of::<CellVertex>(), 16);
    }

    #[test]
    fn test_new_cell_is_empty_and_healthy() {
        let cell = GridCell::new(CellCoord::new(2, 3), Vec2::new(0.5, 0.25), [None; 4]);
        assert!(cell.build_state().is_empty());
        assert_eq!(cell.health(), MAX_HEALTH);
        assert!(cell.instances().is_empty());
        assert_eq!(cell.vertex().position, [0.5, 0.25]);
    }

    #[test]
    fn test_take_instances_empties_cell() {
        let mut cell = GridCell::new(CellCoord::new(0, 0), Vec2::ZERO, [None; 4]);
        cell.push_instance(InstanceBufferRange {
            mesh: roomgame_core::types::MeshId(1),
            offset: 4,
        });
        assert_eq!(cell.take_instances().len(), 1);
        assert!(cell.instances().is_empty());
    }
}
