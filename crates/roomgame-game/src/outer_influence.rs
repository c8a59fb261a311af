//! The adversary circling above the grid.
//!
//! Every action cycle it picks a behaviour: patrol to a random point,
//! dive at the closest wall, or pull back and leave that wall infected.
//! Positions are grid-local, with z the height above the grid plane.

use glam::Vec3;
use roomgame_core::constants::*;
use roomgame_core::error::SyncError;
use roomgame_core::rng::Rng;
use roomgame_core::sync::{SharedState, SyncDecoder, SyncEncoder};
use roomgame_core::types::{BuildState, CellCoord, InstanceBufferRange};
use roomgame_grid::{BuildMode, InteractiveGrid};
use roomgame_render::{MeshInstance, MeshInstanceBuilder, RoomSegmentMeshPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum OuterInfluenceMode {
    #[default]
    Patrol = 0,
    Attack = 1,
    Retreat = 2,
}

impl OuterInfluenceMode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Patrol),
            1 => Some(Self::Attack),
            2 => Some(Self::Retreat),
            _ => None,
        }
    }
}

pub struct OuterInfluence {
    mode: OuterInfluenceMode,
    position: Vec3,
    old_position: Vec3,
    target_position: Vec3,
    pos_diff: Vec3,
    /// Progress towards the next decision; acts once it passes 1.
    action_status: f32,
    rng: Rng,
    speed: f32,
    patrol_height: f32,
    attack_height: f32,
    /// Wall cell picked by the last attack.
    target_cell: Option<CellCoord>,
    range: Option<InstanceBufferRange>,
}

impl OuterInfluence {
    pub fn new(seed: u32, patrol_height: f32, attack_height: f32) -> Self {
        let start = Vec3::new(0.0, 0.0, patrol_height);
        Self {
            mode: OuterInfluenceMode::Patrol,
            position: start,
            old_position: start,
            target_position: start,
            pos_diff: Vec3::ZERO,
            action_status: 0.0,
            rng: Rng::new(seed),
            speed: OUTER_INFLUENCE_SPEED,
            patrol_height,
            attack_height,
            target_cell: None,
            range: None,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn mode(&self) -> OuterInfluenceMode {
        self.mode
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target_position(&self) -> Vec3 {
        self.target_position
    }

    pub fn action_status(&self) -> f32 {
        self.action_status
    }

    pub fn target_cell(&self) -> Option<CellCoord> {
        self.target_cell
    }

    /// Per-frame movement towards the current target.
    pub fn update(&mut self, dt: f32) {
        self.action_status += OUTER_INFLUENCE_ACTION_RATE * dt;
        self.position += self.pos_diff * (self.speed * dt);
    }

    /// Low-frequency tick. Returns true if a new action was decided.
    pub fn update_slow(&mut self, builder: &mut MeshInstanceBuilder<'_>) -> bool {
        if self.action_status <= 1.0 {
            return false;
        }
        self.action_status = 0.0;
        self.old_position = self.target_position;
        self.position = self.target_position;
        self.decide_next_action(builder);
        true
    }

    /// Run the current mode's action, then pick the next mode.
    pub fn decide_next_action(&mut self, builder: &mut MeshInstanceBuilder<'_>) {
        match self.mode {
            OuterInfluenceMode::Patrol => self.patrol(&*builder.grid),
            OuterInfluenceMode::Attack => self.attack(&*builder.grid),
            OuterInfluenceMode::Retreat => self.retreat(builder),
        }
        self.pos_diff = self.target_position - self.old_position;

        let next = match self.mode {
            OuterInfluenceMode::Patrol => {
                let roll = (self.rng.next_u32() % OUTER_INFLUENCE_ROLL_MODULUS) as i32;
                OuterInfluenceMode::from_u32((roll - OUTER_INFLUENCE_ROLL_OFFSET).max(0) as u32)
                    .unwrap_or_default()
            }
            OuterInfluenceMode::Attack => OuterInfluenceMode::Retreat,
            OuterInfluenceMode::Retreat => OuterInfluenceMode::Patrol,
        };
        if next != self.mode {
            log::debug!("OuterInfluence: {:?} -> {:?}", self.mode, next);
        }
        self.mode = next;
    }

    fn patrol(&mut self, grid: &InteractiveGrid) {
        let width = grid.columns() as f32 * grid.cell_size();
        let height = grid.rows() as f32 * grid.cell_size();
        let rx = (self.rng.next_u32() % 10) as f32 / 10.0;
        let ry = (self.rng.next_u32() % 10) as f32 / 10.0;
        self.target_position = Vec3::new(
            GRID_ORIGIN + rx * width,
            GRID_ORIGIN + ry * height,
            self.patrol_height,
        );
    }

    /// Closest committed wall. Walls of a room still being sized are skipped.
    fn closest_wall(&self, grid: &InteractiveGrid) -> Option<CellCoord> {
        grid.closest_cell_where(self.old_position.truncate(), |c| {
            let state = c.build_state();
            state.contains(BuildState::WALL) && !state.contains(BuildState::TEMPORARY)
        })
    }

    fn attack(&mut self, grid: &InteractiveGrid) {
        self.target_cell = self.closest_wall(grid);
        match self.target_cell {
            Some(coord) => {
                self.target_position = grid.cell_center(coord).extend(self.attack_height);
                log::info!("OuterInfluence: attacking wall {:?}", coord);
            }
            None => self.target_position = self.old_position,
        }
    }

    fn retreat(&mut self, builder: &mut MeshInstanceBuilder<'_>) {
        if let Some(coord) = self.closest_wall(&*builder.grid) {
            builder.build_at(
                coord,
                BuildState::SOURCE | BuildState::INFECTED,
                BuildMode::Additive,
            );
            builder.update_health(coord, MIN_HEALTH);
            log::info!("OuterInfluence: wall {:?} is now an infection source", coord);
        }
        self.target_cell = None;
        self.target_position = Vec3::new(0.0, 0.0, self.patrol_height);
    }

    /// Give the agent an instance in the mesh registered for
    /// OUTER_INFLUENCE. Without such a mesh the agent stays invisible.
    pub fn attach_mesh(&mut self, pool: &mut RoomSegmentMeshPool, grid: &InteractiveGrid) -> bool {
        if self.range.is_some() {
            return true;
        }
        let Some(mesh) = pool
            .select_meshes(BuildState::OUTER_INFLUENCE, (0, 0))
            .into_iter()
            .next()
        else {
            log::warn!("OuterInfluence: no mesh registered, agent is not drawn");
            return false;
        };
        self.range = pool.add_instance(mesh, self.instance(grid));
        self.range.is_some()
    }

    fn instance(&self, grid: &InteractiveGrid) -> MeshInstance {
        MeshInstance {
            translation: (grid.translation() + self.position).to_array(),
            scale: grid.cell_size() / INSTANCE_SCALE_DIVISOR,
            build_state: BuildState::OUTER_INFLUENCE.bits(),
            health: MAX_HEALTH,
            _pad: [0; 2],
        }
    }

    /// Move the agent's instance to its current position.
    pub fn write_instance(&self, pool: &mut RoomSegmentMeshPool, grid: &InteractiveGrid) {
        if let Some(range) = self.range {
            let instance = self.instance(grid);
            pool.update_instance(range, |i| *i = instance);
        }
    }
}

impl SharedState for OuterInfluence {
    fn encode(&self, encoder: &mut SyncEncoder) {
        encoder.write_f32(self.position.x);
        encoder.write_f32(self.position.y);
        encoder.write_f32(self.position.z);
        encoder.write_u32(self.mode as u32);
    }

    fn decode(&mut self, decoder: &mut SyncDecoder<'_>) -> Result<(), SyncError> {
        self.position = Vec3::new(decoder.read_f32()?, decoder.read_f32()?, decoder.read_f32()?);
        let mode = decoder.read_u32()?;
        self.mode = OuterInfluenceMode::from_u32(mode).ok_or(SyncError::InvalidValue {
            what: "outer influence mode",
            value: mode,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room_manager::RoomInteractionManager;
    use roomgame_sim::CpuAutomaton;

    struct Fixture {
        grid: InteractiveGrid,
        pool: RoomSegmentMeshPool,
        automaton: CpuAutomaton,
    }

    impl Fixture {
        fn new() -> Self {
            let mut pool = RoomSegmentMeshPool::new("room_segment", 100);
            pool.add_mesh(&[BuildState::OUTER_INFLUENCE], "outer_influence");
            Self {
                grid: InteractiveGrid::new(10, 10, 2.0).unwrap(),
                pool,
                automaton: CpuAutomaton::new(10, 10),
            }
        }

        fn builder(&mut self) -> MeshInstanceBuilder<'_> {
            MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton)
        }
    }

    #[test]
    fn test_update_moves_along_diff() {
        let mut oi = OuterInfluence::new(1, 1.0, 0.3);
        oi.pos_diff = Vec3::new(1.0, 0.0, 0.0);
        oi.update(2.0);
        assert!((oi.position().x - 0.2).abs() < 1e-6);
        assert!((oi.action_status() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_update_slow_waits_for_action_status() {
        let mut f = Fixture::new();
        let mut oi = OuterInfluence::new(1, 1.0, 0.3);
        oi.update(5.0);
        assert!(!oi.update_slow(&mut f.builder()));
        oi.update(6.0);
        assert!(oi.update_slow(&mut f.builder()));
        assert_eq!(oi.action_status(), 0.0);
    }

    #[test]
    fn test_patrol_target_inside_grid() {
        let mut f = Fixture::new();
        let mut oi = OuterInfluence::new(3, 1.0, 0.3);
        for _ in 0..20 {
            oi.mode = OuterInfluenceMode::Patrol;
            oi.decide_next_action(&mut f.builder());
            let t = oi.target_position();
            assert!(t.x >= -1.0 && t.x < 1.0);
            assert!(t.y >= -1.0 && t.y < 1.0);
            assert_eq!(t.z, 1.0);
            assert_ne!(oi.mode(), OuterInfluenceMode::Retreat);
        }
    }

    #[test]
    fn test_patrol_eventually_attacks() {
        let mut f = Fixture::new();
        let mut oi = OuterInfluence::new(9, 1.0, 0.3);
        let attacked = (0..200).any(|_| {
            oi.mode = OuterInfluenceMode::Patrol;
            oi.decide_next_action(&mut f.builder());
            oi.mode() == OuterInfluenceMode::Attack
        });
        assert!(attacked);
    }

    #[test]
    fn test_attack_then_retreat_infects_closest_wall() {
        let mut f = Fixture::new();
        let near = CellCoord::new(1, 1);
        let far = CellCoord::new(8, 8);
        f.builder().build_at(near, BuildState::WALL_LEFT, BuildMode::Replace);
        f.builder().build_at(far, BuildState::WALL_TOP, BuildMode::Replace);

        let mut oi = OuterInfluence::new(1, 1.0, 0.3);
        oi.old_position = Vec3::new(-0.8, -0.8, 1.0);
        oi.mode = OuterInfluenceMode::Attack;
        oi.decide_next_action(&mut f.builder());
        assert_eq!(oi.target_cell(), Some(near));
        let center = f.grid.cell_center(near);
        assert_eq!(oi.target_position(), center.extend(0.3));
        assert_eq!(oi.mode(), OuterInfluenceMode::Retreat);

        oi.old_position = oi.target_position();
        oi.decide_next_action(&mut f.builder());
        let state = f.grid.state_at(near).unwrap();
        assert!(state.contains(BuildState::SOURCE | BuildState::INFECTED | BuildState::WALL));
        assert_eq!(f.grid.cell_at(near).unwrap().health(), MIN_HEALTH);
        assert_eq!(f.grid.state_at(far), Some(BuildState::WALL_TOP));
        assert_eq!(oi.target_position(), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(oi.mode(), OuterInfluenceMode::Patrol);
    }

    #[test]
    fn test_temporary_room_walls_are_not_attacked() {
        let mut f = Fixture::new();
        let far = CellCoord::new(8, 8);
        f.builder().build_at(far, BuildState::WALL_TOP, BuildMode::Replace);
        let mut rooms = RoomInteractionManager::new(0.1, 3);
        rooms.start_new_room_interaction_at_touched_cell(&mut f.builder(), 4, CellCoord::new(1, 1));
        rooms.adjust_temporary_room_size(&mut f.builder(), 4, CellCoord::new(4, 4));

        let mut oi = OuterInfluence::new(1, 1.0, 0.3);
        oi.old_position = Vec3::new(-0.8, -0.8, 1.0);
        oi.mode = OuterInfluenceMode::Attack;
        oi.decide_next_action(&mut f.builder());
        assert_eq!(oi.target_cell(), Some(far));
        oi.decide_next_action(&mut f.builder());
        assert!(f.grid.state_at(far).unwrap().contains(BuildState::SOURCE));

        // Shrink below the minimum span and release: nothing may be left.
        rooms.adjust_temporary_room_size(&mut f.builder(), 4, CellCoord::new(2, 2));
        assert!(!rooms.finalize_temporary_room(&mut f.builder(), 4));
        f.grid.for_each_cell(|c| {
            if c.coord() != far {
                assert_eq!(c.build_state(), BuildState::EMPTY, "{:?}", c.coord());
            }
        });
    }

    #[test]
    fn test_attack_without_walls_holds_position() {
        let mut f = Fixture::new();
        let mut oi = OuterInfluence::new(1, 1.0, 0.3);
        oi.mode = OuterInfluenceMode::Attack;
        oi.decide_next_action(&mut f.builder());
        assert_eq!(oi.target_cell(), None);
        assert_eq!(oi.pos_diff, Vec3::ZERO);
    }

    #[test]
    fn test_instance_follows_position() {
        let mut f = Fixture::new();
        let mut oi = OuterInfluence::new(1, 1.0, 0.3);
        assert!(oi.attach_mesh(&mut f.pool, &f.grid));
        assert_eq!(f.pool.live_instance_count(), 1);
        oi.position = Vec3::new(0.5, 0.25, 1.0);
        f.grid.set_translation(Vec3::new(0.0, 0.0, -2.0));
        oi.write_instance(&mut f.pool, &f.grid);
        let range = oi.range.unwrap();
        let inst = f.pool.instance(range).unwrap();
        assert_eq!(inst.translation, [0.5, 0.25, -1.0]);
        assert_eq!(inst.build_state, BuildState::OUTER_INFLUENCE.bits());
    }

    #[test]
    fn test_sync_rejects_unknown_mode() {
        let mut enc = SyncEncoder::new();
        enc.write_f32(0.0);
        enc.write_f32(0.0);
        enc.write_f32(0.0);
        enc.write_u32(7);
        let bytes = enc.into_bytes();
        let mut oi = OuterInfluence::new(1, 1.0, 0.3);
        assert!(oi.decode(&mut SyncDecoder::new(&bytes)).is_err());
    }

    #[test]
    fn test_sync_round_trip() {
        let mut master = OuterInfluence::new(1, 1.0, 0.3);
        master.position = Vec3::new(0.1, 0.2, 0.3);
        master.mode = OuterInfluenceMode::Retreat;
        let mut enc = SyncEncoder::new();
        master.encode(&mut enc);
        let bytes = enc.into_bytes();
        let mut slave = OuterInfluence::new(2, 1.0, 0.3);
        slave.decode(&mut SyncDecoder::new(&bytes)).unwrap();
        assert_eq!(slave.position(), master.position());
        assert_eq!(slave.mode(), OuterInfluenceMode::Retreat);
    }
}
