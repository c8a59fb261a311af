use std::time::Instant;

use roomgame_core::error::RoomgameError;
use roomgame_core::sync::{SharedState, SyncDecoder, SyncEncoder};
use roomgame_core::types::{BuildState, CellCoord};
use roomgame_game::{GameConfig, PointerEvent, PointerPhase, PointerPosition, RoomGame};

use crate::scenes::{SceneConfig, Step};

/// Timing data for the frames of one scene.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

/// State of a session after its script and frames have run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SceneResult {
    pub scene_name: String,
    pub frame_count: u32,
    pub rooms: usize,
    pub room_cells: usize,
    pub infected_cells: usize,
    pub source_cells: usize,
    pub simulated_cells: usize,
    pub live_instances: u32,
    pub transitions: u64,
    pub outer_influence_mode: String,
    pub snapshot_bytes: usize,
    /// The slave's decoded grid matched the master's after every frame.
    pub slave_in_sync: bool,
    pub timings: TimingSeries,
}

/// Plays scenes on a master session mirrored to one slave.
pub struct SceneRunner {
    config: GameConfig,
    frame_count: u32,
    frame_dt: f32,
}

impl SceneRunner {
    pub fn new(config: GameConfig, frame_count: u32, frame_dt: f32) -> Self {
        Self {
            config,
            frame_count,
            frame_dt,
        }
    }

    pub fn run_scene(&self, scene: &SceneConfig) -> Result<SceneResult, RoomgameError> {
        log::info!("Running scene '{}' ({} steps)...", scene.name, scene.steps.len());

        let mut master = RoomGame::new(self.config.clone(), true)?;
        let mut slave = RoomGame::new(self.config.clone(), false)?;
        let mut frame_times = Vec::with_capacity(self.frame_count as usize);
        let mut in_sync = true;
        let mut snapshot_bytes = 0;

        let mut frame = |master: &mut RoomGame, slave: &mut RoomGame| {
            let start = Instant::now();
            master.frame(self.frame_dt);
            frame_times.push(start.elapsed().as_secs_f64() * 1000.0);

            master.pre_sync();
            let mut encoder = SyncEncoder::new();
            master.encode(&mut encoder);
            master.update_synced_master();
            let bytes = encoder.into_bytes();
            snapshot_bytes = bytes.len();
            match slave.decode(&mut SyncDecoder::new(&bytes)) {
                Ok(()) => {
                    slave.update_synced_slave();
                    in_sync &= slave.grid().texels() == master.grid().texels();
                }
                Err(e) => {
                    log::warn!("Slave failed to decode snapshot: {e}");
                    in_sync = false;
                }
            }
        };

        let mut touch_id = 0;
        for step in &scene.steps {
            match *step {
                Step::Key { key, pressed } => {
                    master.handle_key(key, pressed);
                }
                Step::Drag { from, to } => {
                    touch_id += 1;
                    pointer(&mut master, touch_id, PointerPhase::Down, from);
                    pointer(&mut master, touch_id, PointerPhase::Move, to);
                    pointer(&mut master, touch_id, PointerPhase::Up, to);
                }
                Step::Tap { cell } => {
                    touch_id += 1;
                    pointer(&mut master, touch_id, PointerPhase::Down, cell);
                    pointer(&mut master, touch_id, PointerPhase::Up, cell);
                }
                Step::Frames(n) => {
                    for _ in 0..n {
                        frame(&mut master, &mut slave);
                    }
                }
            }
        }
        for _ in 0..self.frame_count {
            frame(&mut master, &mut slave);
        }

        let count = |bits: BuildState| {
            master
                .grid()
                .cells()
                .iter()
                .filter(|c| c.build_state().intersects(bits))
                .count()
        };
        let timings = compute_timings(&frame_times);
        log::info!(
            "  Done: {} rooms, {} infected cells, mean={:.3}ms",
            master.rooms().rooms().len(),
            count(BuildState::INFECTED),
            timings.mean_ms
        );

        Ok(SceneResult {
            scene_name: scene.name.to_string(),
            frame_count: frame_times.len() as u32,
            rooms: master.rooms().rooms().len(),
            room_cells: count(BuildState::ROOM_PART),
            infected_cells: count(BuildState::INFECTED),
            source_cells: count(BuildState::SOURCE),
            simulated_cells: count(BuildState::SIMULATED_STATE),
            live_instances: master.pool().live_instance_count(),
            transitions: master.transitions(),
            outer_influence_mode: format!("{:?}", master.outer_influence().mode()),
            snapshot_bytes,
            slave_in_sync: in_sync,
            timings,
        })
    }
}

/// Send a pointer event at the center of `cell`.
fn pointer(game: &mut RoomGame, id: u32, phase: PointerPhase, cell: (u32, u32)) -> bool {
    let grid = game.grid();
    let ndc = grid.ndc(grid.cell_center(CellCoord::new(cell.0, cell.1)));
    game.handle_pointer(PointerEvent {
        id,
        phase,
        position: PointerPosition::Ndc(ndc),
    })
}

/// Compute timing statistics from a list of frame times in milliseconds.
fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            max_ms: 0.0,
        };
    }
    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let percentile = |p: f64| sorted[((sorted.len() - 1) as f64 * p).round() as usize];
    TimingSeries {
        mean_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
        median_ms: percentile(0.5),
        p95_ms: percentile(0.95),
        max_ms: sorted[sorted.len() - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::standard_scenes;

    fn runner(frames: u32) -> SceneRunner {
        SceneRunner::new(GameConfig::default(), frames, 1.0 / 60.0)
    }

    #[test]
    fn test_compute_timings() {
        let t = compute_timings(&[4.0, 1.0, 3.0, 2.0, 5.0]);
        assert_eq!(t.mean_ms, 3.0);
        assert_eq!(t.median_ms, 3.0);
        assert_eq!(t.max_ms, 5.0);
        assert_eq!(compute_timings(&[]).max_ms, 0.0);
    }

    #[test]
    fn test_first_room_scene() {
        let scenes = standard_scenes();
        let result = runner(5).run_scene(&scenes[0]).unwrap();
        assert_eq!(result.rooms, 1);
        assert_eq!(result.room_cells, 16);
        assert_eq!(result.frame_count, 5);
        assert!(result.slave_in_sync);
    }

    #[test]
    fn test_building_rejects_detached_room() {
        let scenes = standard_scenes();
        let result = runner(1).run_scene(&scenes[1]).unwrap();
        assert_eq!(result.rooms, 3);
        assert_eq!(result.room_cells, 8 * 8 + 6 * 8 + 8 * 6);
    }

    #[test]
    fn test_infection_scene_runs_automaton() {
        let scenes = standard_scenes();
        let result = runner(30).run_scene(&scenes[2]).unwrap();
        assert!(result.transitions > 0);
        assert!(result.slave_in_sync);
    }
}
