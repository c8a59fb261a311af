//! Contract between the grid and a cellular automaton that advances cell
//! states in discrete transitions.

use crate::constants::*;
use crate::types::{BuildState, CellCoord, CellTexel};
use serde::{Deserialize, Serialize};

/// Tunables handed to every automaton transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonConfig {
    /// Seconds between two transitions.
    pub transition_time: f32,
    /// Drift of simulated cells per transition, in (column, row).
    pub move_dir: [i32; 2],
    pub birth_threshold: f32,
    pub death_threshold: f32,
    pub collision_threshold: f32,
    pub outer_influence_neighbor_threshold: u32,
    pub damage_per_cell: i32,
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            transition_time: DEFAULT_TRANSITION_TIME,
            move_dir: [1, 0],
            birth_threshold: DEFAULT_BIRTH_THRESHOLD,
            death_threshold: DEFAULT_DEATH_THRESHOLD,
            collision_threshold: DEFAULT_COLLISION_THRESHOLD,
            outer_influence_neighbor_threshold: DEFAULT_OUTER_INFLUENCE_NEIGHBOR_THRESHOLD,
            damage_per_cell: DEFAULT_DAMAGE_PER_CELL,
        }
    }
}

/// A cell whose state or health changed during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellTransition {
    pub coord: CellCoord,
    pub state: BuildState,
    pub health: i32,
}

/// A cellular automaton over the grid.
///
/// The grid pushes its authoritative state in through `update_cell`; the
/// automaton reports back what changed each time `transition` fires.
pub trait CellularAutomaton {
    fn is_initialized(&self) -> bool;

    /// Seed the automaton. Transitions are skipped until this has run.
    fn initialize(&mut self);

    /// Overwrite one cell of the latest state.
    fn update_cell(&mut self, coord: CellCoord, state: BuildState, health: i32);

    /// Advance if `time` is at least one transition period past the last
    /// transition. Returns `None` when no transition happened.
    fn transition(&mut self, time: f32, config: &AutomatonConfig) -> Option<Vec<CellTransition>>;

    /// State after the most recent transition, column-major.
    fn latest_texture(&self) -> &[CellTexel];

    /// State before the most recent transition, column-major.
    fn previous_texture(&self) -> &[CellTexel];

    /// Progress towards the next transition in [0, 1], used to blend the
    /// two textures.
    fn time_delta_normalized(&self, time: f32, config: &AutomatonConfig) -> f32;
}
