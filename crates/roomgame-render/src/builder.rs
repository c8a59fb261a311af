//! Bridges grid build-state changes to mesh instances and the automaton.

use crate::instance::MeshInstance;
use crate::pool::RoomSegmentMeshPool;
use roomgame_core::automaton::CellularAutomaton;
use roomgame_core::constants::MAX_HEALTH;
use roomgame_core::direction::WALL_FACINGS;
use roomgame_core::types::{BuildState, CellCoord};
use roomgame_grid::{BuildMode, CellPlacement, GridCell, InteractiveGrid, StateChangeHook};

/// Add one instance per mesh matching the cell's current state.
pub fn add_instance_at(pool: &mut RoomSegmentMeshPool, cell: &mut GridCell, placement: CellPlacement) {
    let coord = cell.coord();
    let state = cell.build_state();
    let instance = MeshInstance::new(placement, state, cell.health());
    for mesh in pool.select_meshes(state, (coord.col, coord.row)) {
        if let Some(range) = pool.add_instance(mesh, instance) {
            cell.push_instance(range);
        }
    }
}

/// Release every instance owned by the cell.
pub fn remove_instance_at(pool: &mut RoomSegmentMeshPool, cell: &mut GridCell) {
    for range in cell.take_instances() {
        if !pool.remove_instance(range) {
            log::warn!("Cell {:?} held a stale instance range {:?}", cell.coord(), range);
        }
    }
}

/// Keeps mesh instances in step with build states. Every change resets
/// the cell to full health.
pub struct MeshInstancing<'a> {
    pub pool: &'a mut RoomSegmentMeshPool,
}

impl StateChangeHook for MeshInstancing<'_> {
    fn on_state_change(&mut self, cell: &mut GridCell, previous: BuildState, placement: CellPlacement) {
        if !previous.is_empty() {
            remove_instance_at(self.pool, cell);
        }
        cell.set_health(MAX_HEALTH);
        if !cell.build_state().is_empty() {
            add_instance_at(self.pool, cell, placement);
        }
    }
}

/// Forwards the cell's new state and health to the automaton.
pub struct AutomatonNotify<'a> {
    pub automaton: &'a mut dyn CellularAutomaton,
}

impl StateChangeHook for AutomatonNotify<'_> {
    fn on_state_change(&mut self, cell: &mut GridCell, _: BuildState, _: CellPlacement) {
        self.automaton
            .update_cell(cell.coord(), cell.build_state(), cell.health());
    }
}

/// Grid, mesh pool and automaton borrowed together for one batch of
/// build operations.
pub struct MeshInstanceBuilder<'a> {
    pub grid: &'a mut InteractiveGrid,
    pub pool: &'a mut RoomSegmentMeshPool,
    pub automaton: &'a mut dyn CellularAutomaton,
}

impl<'a> MeshInstanceBuilder<'a> {
    pub fn new(
        grid: &'a mut InteractiveGrid,
        pool: &'a mut RoomSegmentMeshPool,
        automaton: &'a mut dyn CellularAutomaton,
    ) -> Self {
        Self {
            grid,
            pool,
            automaton,
        }
    }

    /// The grid plus the hook chain (mesh instancing, then automaton).
    pub fn split(&mut self) -> (&mut InteractiveGrid, (MeshInstancing<'_>, AutomatonNotify<'_>)) {
        (
            &mut *self.grid,
            (
                MeshInstancing {
                    pool: &mut *self.pool,
                },
                AutomatonNotify {
                    automaton: &mut *self.automaton,
                },
            ),
        )
    }

    pub fn build_at(&mut self, coord: CellCoord, bits: BuildState, mode: BuildMode) -> bool {
        let (grid, mut hook) = self.split();
        grid.build_at(coord, bits, mode, &mut hook)
    }

    /// Add instances for the cell's current state without touching it.
    pub fn add_instance_at(&mut self, coord: CellCoord) {
        let pool = &mut *self.pool;
        self.grid
            .with_cell_mut(coord, |cell, placement| add_instance_at(pool, cell, placement));
    }

    pub fn remove_instance_at(&mut self, coord: CellCoord) {
        let pool = &mut *self.pool;
        self.grid
            .with_cell_mut(coord, |cell, _| remove_instance_at(pool, cell));
    }

    /// Set a cell's health on the grid, its instances and the automaton.
    pub fn update_health(&mut self, coord: CellCoord, health: i32) -> bool {
        if !self.grid.set_health(coord, health) {
            return false;
        }
        let Some(cell) = self.grid.cell_at(coord) else {
            return false;
        };
        for range in cell.instances() {
            self.pool.update_instance(*range, |inst| inst.health = health);
        }
        self.automaton.update_cell(coord, cell.build_state(), health);
        true
    }

    /// Merge a directional wall with the facing wall of its neighbour.
    ///
    /// With `simulate` only reports whether a merge would happen. Returns
    /// false if the cell is not a wall, has no neighbour in its facing
    /// direction, or that neighbour is not a wall.
    pub fn delete_neighbouring_walls(&mut self, coord: CellCoord, simulate: bool) -> bool {
        let Some(state) = self.grid.state_at(coord) else {
            return false;
        };
        if !state.contains(BuildState::WALL) {
            return false;
        }
        let Some(&(_, dir)) = WALL_FACINGS.iter().find(|(bit, _)| state.contains(*bit)) else {
            return false;
        };
        let Some((other, other_state)) = self
            .grid
            .neighbor_of(coord, dir)
            .map(|c| (c.coord(), c.build_state()))
        else {
            return false;
        };
        if !other_state.contains(BuildState::WALL) {
            return false;
        }
        if simulate {
            return true;
        }
        let merged = |s: BuildState| (s & BuildState::MERGE_PRESERVED) | BuildState::INSIDE_ROOM;
        self.build_at(coord, merged(state), BuildMode::Replace);
        self.build_at(other, merged(other_state), BuildMode::Replace);
        log::debug!("Merged walls {:?} and {:?}", coord, other);
        true
    }
}
