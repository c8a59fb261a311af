use std::collections::VecDeque;

use roomgame_core::automaton::CellTransition;
use roomgame_core::types::{BuildState, CellCoord};
use roomgame_grid::BuildMode;
use roomgame_render::MeshInstanceBuilder;

/// A state change held back for a number of automaton transitions so the
/// removal of simulated fluid can animate first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayedUpdate {
    pub wait_count: u32,
    pub target: CellCoord,
    pub to_state: BuildState,
}

/// Pulls automaton results back into the grid.
#[derive(Debug, Default)]
pub struct AutomatonUpdater {
    /// Newest first.
    pending: VecDeque<DelayedUpdate>,
}

impl AutomatonUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> impl Iterator<Item = &DelayedUpdate> {
        self.pending.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply one automaton result to the grid.
    ///
    /// A cell losing its simulated state is delayed by one transition.
    /// Anything else is written immediately, then the automaton's health
    /// is restored over the reset the build applied. A new request for a
    /// cell replaces whatever was pending for it.
    pub fn update_grid_at(
        &mut self,
        builder: &mut MeshInstanceBuilder<'_>,
        coord: CellCoord,
        new_state: BuildState,
        health: i32,
    ) {
        let Some(current) = builder.grid.state_at(coord) else {
            return;
        };
        self.pending.retain(|d| d.target != coord);

        if current.contains(BuildState::SIMULATED_STATE)
            && !new_state.contains(BuildState::SIMULATED_STATE)
        {
            self.pending.push_front(DelayedUpdate {
                wait_count: 1,
                target: coord,
                to_state: new_state,
            });
            return;
        }

        builder.build_at(coord, new_state, BuildMode::Replace);
        builder.update_health(coord, health);
    }

    /// Apply a batch of transitions in order.
    pub fn apply_transitions(&mut self, builder: &mut MeshInstanceBuilder<'_>, transitions: &[CellTransition]) {
        for t in transitions {
            self.update_grid_at(builder, t.coord, t.state, t.health);
        }
    }

    /// Called once per automaton transition: count every pending update
    /// down and apply those that are due. Returns how many were applied.
    ///
    /// A due update clears the simulated bit it was waiting on and adds its
    /// target bits to whatever the cell holds now. A plain additive merge
    /// would keep the simulated bit, which is the one thing the update
    /// exists to remove.
    pub fn on_transition(&mut self, builder: &mut MeshInstanceBuilder<'_>) -> usize {
        let mut applied = 0;
        self.pending.retain_mut(|d| {
            d.wait_count = d.wait_count.saturating_sub(1);
            if d.wait_count > 0 {
                return true;
            }
            if let Some(live) = builder.grid.state_at(d.target) {
                let next = (live & !BuildState::SIMULATED_STATE) | d.to_state;
                builder.build_at(d.target, next, BuildMode::Replace);
            }
            applied += 1;
            false
        });
        if applied > 0 {
            log::debug!("AutomatonUpdater: applied {} delayed updates", applied);
        }
        applied
    }

    /// Push the grid's authoritative state of a cell into the automaton.
    pub fn update_automaton_at(&self, builder: &mut MeshInstanceBuilder<'_>, coord: CellCoord) {
        if let Some(cell) = builder.grid.cell_at(coord) {
            builder
                .automaton
                .update_cell(coord, cell.build_state(), cell.health());
        }
    }

    /// Mark every cell within `radius` cells of `center` as simulated.
    /// Returns how many cells changed.
    pub fn populate_circle(
        &self,
        builder: &mut MeshInstanceBuilder<'_>,
        center: CellCoord,
        radius: f32,
    ) -> usize {
        let r = radius.max(0.0).ceil() as i64;
        let (cols, rows) = (builder.grid.columns() as i64, builder.grid.rows() as i64);
        let mut changed = 0;
        for dc in -r..=r {
            for dr in -r..=r {
                let col = center.col as i64 + dc;
                let row = center.row as i64 + dr;
                if col < 0 || row < 0 || col >= cols || row >= rows {
                    continue;
                }
                if ((dc * dc + dr * dr) as f32).sqrt() > radius {
                    continue;
                }
                let coord = CellCoord::new(col as u32, row as u32);
                if builder.build_at(coord, BuildState::SIMULATED_STATE, BuildMode::Additive) {
                    changed += 1;
                }
            }
        }
        log::debug!("Populated {} cells around {:?}", changed, center);
        changed
    }
}
