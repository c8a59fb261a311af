//! CPU cellular automaton over the grid.
//!
//! Two cell-state buffers alternate roles each transition, like the
//! ping-pong textures a shader implementation would use. Rules, applied to
//! the latest state to produce the next one:
//!
//! - Free cells carry simulated fluid. Fluid advects one cell along
//!   `move_dir` per transition, then survives or is born depending on how
//!   many of the source cell's eight neighbours are simulated.
//! - Fluid about to flow into a room piles up in place while enough of its
//!   neighbours are simulated (`collision_threshold`).
//! - A wall with at least `outer_influence_neighbor_threshold` simulated
//!   neighbours loses `damage_per_cell` health per neighbour and becomes an
//!   infection source when it runs out.
//! - Room cells next to infected cells lose health the same way and become
//!   infected when it runs out. Sources never change on their own, and any
//!   fluid left on a room cell is dropped.
//! - Cells of a room still being sized are left alone.

use glam::IVec2;
use roomgame_core::automaton::{AutomatonConfig, CellTransition, CellularAutomaton};
use roomgame_core::constants::{MAX_HEALTH, MIN_HEALTH};
use roomgame_core::direction::MOORE_OFFSETS;
use roomgame_core::types::{BuildState, CellCoord, CellTexel};

pub struct CpuAutomaton {
    columns: u32,
    rows: u32,
    textures: [Vec<CellTexel>; 2],
    /// 0 or 1: index of the texture holding the latest state.
    latest: usize,
    initialized: bool,
    last_transition: f32,
    transition_count: u64,
}

impl CpuAutomaton {
    pub fn new(columns: u32, rows: u32) -> Self {
        let blank = vec![CellTexel::new(BuildState::EMPTY, MAX_HEALTH); (columns * rows) as usize];
        Self {
            columns,
            rows,
            textures: [blank.clone(), blank],
            latest: 0,
            initialized: false,
            last_transition: f32::NEG_INFINITY,
            transition_count: 0,
        }
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col >= 0 && row >= 0 && (col as u32) < self.columns && (row as u32) < self.rows {
            Some((col as u32 * self.rows + row as u32) as usize)
        } else {
            None
        }
    }

    fn texel(&self, pos: IVec2) -> Option<CellTexel> {
        self.index(pos.x, pos.y).map(|i| self.textures[self.latest][i])
    }

    fn count_neighbors(&self, pos: IVec2, bits: BuildState) -> u32 {
        MOORE_OFFSETS
            .iter()
            .filter(|off| {
                self.texel(pos + **off)
                    .is_some_and(|t| t.build_state().contains(bits))
            })
            .count() as u32
    }

    fn is_free(state: BuildState) -> bool {
        !state.intersects(BuildState::ROOM_PART)
    }

    fn next_fluid(&self, pos: IVec2, state: BuildState, config: &AutomatonConfig) -> bool {
        let dir = IVec2::new(config.move_dir[0], config.move_dir[1]);
        let alive = state.contains(BuildState::SIMULATED_STATE);

        let downstream = self.texel(pos + dir);
        let blocked = downstream.is_some_and(|t| !Self::is_free(t.build_state()));
        if alive && blocked {
            let fraction = self.count_neighbors(pos, BuildState::SIMULATED_STATE) as f32 / 8.0;
            if fraction >= config.collision_threshold {
                return true;
            }
        }

        let src = pos - dir;
        let Some(src_texel) = self.texel(src) else {
            return false;
        };
        let src_state = src_texel.build_state();
        if !Self::is_free(src_state) {
            return false;
        }
        let fraction = self.count_neighbors(src, BuildState::SIMULATED_STATE) as f32 / 8.0;
        if src_state.contains(BuildState::SIMULATED_STATE) {
            1.0 - fraction <= config.death_threshold
        } else {
            fraction >= config.birth_threshold
        }
    }

    fn next_room_cell(
        &self,
        pos: IVec2,
        texel: CellTexel,
        config: &AutomatonConfig,
    ) -> (BuildState, i32) {
        // Room cells never hold fluid.
        let state = texel.build_state() & !BuildState::SIMULATED_STATE;
        if state.contains(BuildState::SOURCE) {
            return (state, texel.health);
        }

        let mut damage = 0;
        let mut wall_hit = false;
        if state.contains(BuildState::WALL) {
            let simulated = self.count_neighbors(pos, BuildState::SIMULATED_STATE);
            if simulated >= config.outer_influence_neighbor_threshold {
                damage += config.damage_per_cell * simulated as i32;
                wall_hit = true;
            }
        }
        if !state.contains(BuildState::INFECTED) {
            let infected = self.count_neighbors(pos, BuildState::INFECTED);
            damage += config.damage_per_cell * infected as i32;
        }
        if damage == 0 {
            return (state, texel.health);
        }

        let health = (texel.health - damage).max(MIN_HEALTH);
        let mut next = state;
        if health <= MIN_HEALTH {
            next |= BuildState::INFECTED;
            if wall_hit {
                next |= BuildState::SOURCE;
            }
        }
        (next, health)
    }

    /// Run one transition unconditionally and report the changed cells.
    pub fn step(&mut self, config: &AutomatonConfig) -> Vec<CellTransition> {
        let read = self.latest;
        let write = 1 - read;
        let mut changes = Vec::new();

        for col in 0..self.columns {
            for row in 0..self.rows {
                let i = (col * self.rows + row) as usize;
                let pos = IVec2::new(col as i32, row as i32);
                let texel = self.textures[read][i];
                let state = texel.build_state();

                let (next_state, next_health) = if state.contains(BuildState::TEMPORARY) {
                    (state, texel.health)
                } else if Self::is_free(state) {
                    let mut next = state & !BuildState::SIMULATED_STATE;
                    if self.next_fluid(pos, state, config) {
                        next |= BuildState::SIMULATED_STATE;
                    }
                    (next, texel.health)
                } else {
                    self.next_room_cell(pos, texel, config)
                };

                self.textures[write][i] = CellTexel::new(next_state, next_health);
                if next_state != state || next_health != texel.health {
                    changes.push(CellTransition {
                        coord: CellCoord::new(col, row),
                        state: next_state,
                        health: next_health,
                    });
                }
            }
        }

        self.latest = write;
        self.transition_count += 1;
        changes
    }
}

impl CellularAutomaton for CpuAutomaton {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn initialize(&mut self) {
        if !self.initialized {
            log::info!("CpuAutomaton: initialized {}x{}", self.columns, self.rows);
        }
        self.initialized = true;
    }

    fn update_cell(&mut self, coord: CellCoord, state: BuildState, health: i32) {
        if let Some(i) = self.index(coord.col as i32, coord.row as i32) {
            self.textures[self.latest][i] = CellTexel::new(state, health);
        }
    }

    fn transition(&mut self, time: f32, config: &AutomatonConfig) -> Option<Vec<CellTransition>> {
        if !self.initialized || time - self.last_transition < config.transition_time {
            return None;
        }
        self.last_transition = time;
        Some(self.step(config))
    }

    fn latest_texture(&self) -> &[CellTexel] {
        &self.textures[self.latest]
    }

    fn previous_texture(&self) -> &[CellTexel] {
        &self.textures[1 - self.latest]
    }

    fn time_delta_normalized(&self, time: f32, config: &AutomatonConfig) -> f32 {
        if config.transition_time <= 0.0 {
            return 1.0;
        }
        ((time - self.last_transition) / config.transition_time).clamp(0.0, 1.0)
    }
}
