use roomgame_core::constants::{MAX_HEALTH, MIN_HEALTH};
use roomgame_core::direction::ALL_DIRECTIONS;
use roomgame_core::types::{BuildState, CellCoord};
use roomgame_grid::{BuildMode, GridInteraction, InteractiveGrid, Room};
use roomgame_render::MeshInstanceBuilder;

/// Turns pointer gestures into rooms and repairs, and owns every
/// committed room.
pub struct RoomInteractionManager {
    rooms: Vec<Room>,
    /// The first committed room does not need to connect to anything.
    first_room: bool,
    heal_amount: f32,
    default_heal_amount: f32,
    min_room_span: u32,
}

impl RoomInteractionManager {
    pub fn new(heal_amount: f32, min_room_span: u32) -> Self {
        Self {
            rooms: Vec::new(),
            first_room: true,
            heal_amount,
            default_heal_amount: heal_amount,
            min_room_span,
        }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn is_first_room(&self) -> bool {
        self.first_room
    }

    pub fn heal_amount(&self) -> f32 {
        self.heal_amount
    }

    pub fn set_heal_amount(&mut self, heal_amount: f32) {
        self.heal_amount = heal_amount;
    }

    pub fn reset_heal_amount(&mut self) {
        self.heal_amount = self.default_heal_amount;
    }

    /// Demolish every committed room and start over.
    pub fn reset(&mut self, builder: &mut MeshInstanceBuilder<'_>) {
        for room in std::mem::take(&mut self.rooms) {
            for coord in room.cells() {
                builder.build_at(coord, BuildState::EMPTY, BuildMode::Replace);
            }
        }
        self.first_room = true;
        self.reset_heal_amount();
        log::info!("RoomInteractionManager: reset");
    }

    /// Pointer pressed over `coord`: start a room on an empty cell or
    /// repair a damaged one. Returns true if anything happened.
    pub fn start_new_room_interaction_at_touched_cell(
        &mut self,
        builder: &mut MeshInstanceBuilder<'_>,
        touch_id: u32,
        coord: CellCoord,
    ) -> bool {
        let Some(state) = builder.grid.state_at(coord) else {
            return false;
        };
        if state.is_empty() {
            return self.start_new_room(builder, touch_id, coord);
        }
        if state.intersects(BuildState::SOURCE | BuildState::INFECTED) {
            return self.try_repair(builder, coord);
        }
        false
    }

    fn start_new_room(
        &mut self,
        builder: &mut MeshInstanceBuilder<'_>,
        touch_id: u32,
        coord: CellCoord,
    ) -> bool {
        if builder.grid.interaction(touch_id).is_some() {
            log::warn!("Touch {} already has an interaction", touch_id);
            return false;
        }
        let mut interaction = GridInteraction::new(touch_id, coord);
        {
            let (grid, mut hook) = builder.split();
            interaction.room.mark(
                grid,
                coord,
                BuildState::INVALID | BuildState::TEMPORARY,
                &mut hook,
            );
        }
        builder.grid.push_interaction(interaction)
    }

    /// Pointer moved to `hovered`: resize the touch's temporary room.
    pub fn adjust_temporary_room_size(
        &mut self,
        builder: &mut MeshInstanceBuilder<'_>,
        touch_id: u32,
        hovered: CellCoord,
    ) {
        let Some(mut interaction) = builder.grid.remove_interaction(touch_id) else {
            return;
        };
        if interaction.last_cell != hovered {
            interaction.last_cell = hovered;
            let (grid, mut hook) = builder.split();
            interaction.room.clear(grid, &mut hook);
            interaction.room.update_corners(interaction.start_cell, hovered);
            self.check_room_position(&*grid, &mut interaction.room);
            interaction
                .room
                .check_validity(self.first_room, self.min_room_span);
            interaction.room.fill(grid, true, &mut hook);
        }
        builder.grid.push_interaction(interaction);
    }

    /// Pointer released: commit the touch's room if valid, discard it
    /// otherwise. Returns true if a room was committed.
    pub fn finalize_temporary_room(
        &mut self,
        builder: &mut MeshInstanceBuilder<'_>,
        touch_id: u32,
    ) -> bool {
        let Some(interaction) = builder.grid.remove_interaction(touch_id) else {
            return false;
        };
        let mut room = interaction.room;
        self.check_room_position(&*builder.grid, &mut room);
        room.check_validity(self.first_room, self.min_room_span);

        {
            let (grid, mut hook) = builder.split();
            room.clear(grid, &mut hook);
        }
        if !room.is_valid {
            log::debug!(
                "Discarded room {:?}..{:?} (collision {}, connected {})",
                room.left_lower(),
                room.right_upper(),
                room.collision,
                room.connected
            );
            return false;
        }

        if self.rooms.is_empty() {
            self.first_room = false;
        }
        {
            let (grid, mut hook) = builder.split();
            room.fill(grid, false, &mut hook);
        }
        room.finish();
        let cells: Vec<CellCoord> = room.cells().collect();
        log::info!(
            "Committed room {:?}..{:?} ({} cells)",
            room.left_lower(),
            room.right_upper(),
            cells.len()
        );
        self.rooms.push(room);
        for coord in cells {
            // Fluid does not survive inside a committed room.
            builder.build_at(coord, BuildState::SIMULATED_STATE, BuildMode::RemoveSpecific);
            builder.delete_neighbouring_walls(coord, false);
        }
        true
    }

    /// Set `collision`, `connected` and `infected_neighbours` for a
    /// candidate room against the committed ones.
    pub fn check_room_position(&self, grid: &InteractiveGrid, room: &mut Room) {
        room.collision = false;
        room.connected = false;
        room.infected_neighbours = false;
        self.check_for_near_infections(grid, room);
        if self.rooms.iter().any(|r| r.overlaps(room)) {
            room.collision = true;
            return;
        }
        room.connected = self.rooms.iter().any(|r| room.connects_to(r));
    }

    /// Flag the room if any cell in the ring around it is infected.
    pub fn check_for_near_infections(&self, grid: &InteractiveGrid, room: &mut Room) {
        room.infected_neighbours = room
            .surrounding_cells(grid.columns(), grid.rows())
            .into_iter()
            .any(|c| {
                grid.state_at(c)
                    .is_some_and(|s| s.contains(BuildState::INFECTED))
            });
    }

    /// Heal an infected or source cell by one repair step.
    ///
    /// Refused while the cell is boxed in by infection, and for sources
    /// while any neighbour is infected without being a source itself. A
    /// source healed to full turns back into wall; an infected cell healed
    /// to full loses the infection.
    pub fn try_repair(&mut self, builder: &mut MeshInstanceBuilder<'_>, coord: CellCoord) -> bool {
        let Some(cell) = builder.grid.cell_at(coord) else {
            return false;
        };
        let state = cell.build_state();
        if !state.intersects(BuildState::SOURCE | BuildState::INFECTED) {
            return false;
        }
        let delta = ((MAX_HEALTH - MIN_HEALTH) as f32 * self.heal_amount) as i32;
        let updated = (cell.health() + delta).min(MAX_HEALTH);

        let neighbors: Vec<BuildState> = ALL_DIRECTIONS
            .iter()
            .map(|dir| {
                builder
                    .grid
                    .neighbor_of(coord, *dir)
                    .map_or(BuildState::EMPTY, |n| n.build_state())
            })
            .collect();
        let and_sides = neighbors
            .iter()
            .fold(BuildState(u32::MAX), |acc, s| acc & *s);
        if and_sides.intersects(BuildState::SOURCE | BuildState::INFECTED) {
            log::debug!("Repair of {:?} refused: surrounded by infection", coord);
            return false;
        }

        if state.contains(BuildState::SOURCE) {
            let blocked = neighbors.iter().any(|n| {
                n.intersects(BuildState::SOURCE | BuildState::INFECTED)
                    && !n.contains(BuildState::SOURCE)
            });
            if blocked {
                log::debug!("Repair of source {:?} refused: infected neighbours", coord);
                return false;
            }
            builder.update_health(coord, updated);
            if updated >= MAX_HEALTH {
                builder.build_at(coord, BuildState::WALL, BuildMode::Additive);
                builder.build_at(
                    coord,
                    BuildState::SOURCE | BuildState::INFECTED,
                    BuildMode::RemoveSpecific,
                );
            }
        } else {
            builder.update_health(coord, updated);
            if updated >= MAX_HEALTH {
                builder.build_at(coord, BuildState::INFECTED, BuildMode::RemoveSpecific);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomgame_core::automaton::{AutomatonConfig, CellularAutomaton};
    use roomgame_render::RoomSegmentMeshPool;
    use roomgame_sim::{AutomatonUpdater, CpuAutomaton};

    struct Fixture {
        grid: InteractiveGrid,
        pool: RoomSegmentMeshPool,
        automaton: CpuAutomaton,
        rooms: RoomInteractionManager,
    }

    impl Fixture {
        fn new() -> Self {
            let mut pool = RoomSegmentMeshPool::new("room_segment", 400);
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
            Self {
                grid: InteractiveGrid::new(20, 20, 2.0).unwrap(),
                pool,
                automaton: CpuAutomaton::new(20, 20),
                rooms: RoomInteractionManager::new(0.1, 3),
            }
        }

        fn builder(&mut self) -> MeshInstanceBuilder<'_> {
            MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton)
        }

        /// Drag from `a` to `b` with touch 1 and release.
        fn drag_room(&mut self, a: (u32, u32), b: (u32, u32)) -> bool {
            let mut builder =
                MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton);
            self.rooms.start_new_room_interaction_at_touched_cell(
                &mut builder,
                1,
                CellCoord::new(a.0, a.1),
            );
            self.rooms
                .adjust_temporary_room_size(&mut builder, 1, CellCoord::new(b.0, b.1));
            self.rooms.finalize_temporary_room(&mut builder, 1)
        }

        fn repair(&mut self, coord: CellCoord) -> bool {
            let mut builder =
                MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton);
            self.rooms.try_repair(&mut builder, coord)
        }

        fn state(&self, col: u32, row: u32) -> BuildState {
            self.grid.state_at(CellCoord::new(col, row)).unwrap()
        }
    }

    #[test]
    fn test_commit_over_fluid_clears_it() {
        let mut f = Fixture::new();
        f.automaton.initialize();
        {
            let mut builder = f.builder();
            builder.build_at(CellCoord::new(6, 6), BuildState::SIMULATED_STATE, BuildMode::Additive);
        }
        assert!(f.drag_room((5, 5), (8, 8)));
        assert_eq!(f.state(6, 6), BuildState::INSIDE_ROOM);
        f.grid.for_each_cell(|c| {
            assert!(!c.build_state().contains(BuildState::SIMULATED_STATE));
        });

        let mut updater = AutomatonUpdater::new();
        let config = AutomatonConfig::default();
        for _ in 0..20 {
            let changes = f.automaton.step(&config);
            let mut builder =
                MeshInstanceBuilder::new(&mut f.grid, &mut f.pool, &mut f.automaton);
            updater.on_transition(&mut builder);
            updater.apply_transitions(&mut builder, &changes);
        }
        assert_eq!(f.state(6, 6), BuildState::INSIDE_ROOM);
        f.grid.for_each_cell(|c| {
            assert!(!c.build_state().contains(BuildState::SIMULATED_STATE));
        });
    }

    #[test]
    fn test_first_room_lifecycle() {
        let mut f = Fixture::new();
        {
            let mut builder =
                MeshInstanceBuilder::new(&mut f.grid, &mut f.pool, &mut f.automaton);
            assert!(f.rooms.start_new_room_interaction_at_touched_cell(
                &mut builder,
                7,
                CellCoord::new(5, 5)
            ));
            f.rooms
                .adjust_temporary_room_size(&mut builder, 7, CellCoord::new(8, 8));
        }
        assert_eq!(f.grid.interaction_count(), 1);
        let mut temporary = 0;
        f.grid.for_each_cell(|c| {
            if c.build_state().contains(BuildState::TEMPORARY) {
                temporary += 1;
            }
        });
        assert_eq!(temporary, 16);
        assert!(!f.state(6, 6).contains(BuildState::INVALID), "valid first room");

        let committed = {
            let mut builder =
                MeshInstanceBuilder::new(&mut f.grid, &mut f.pool, &mut f.automaton);
            f.rooms.finalize_temporary_room(&mut builder, 7)
        };
        assert!(committed);
        assert_eq!(f.grid.interaction_count(), 0);
        assert!(!f.rooms.is_first_room());
        assert_eq!(f.rooms.rooms().len(), 1);
        assert_eq!(f.rooms.rooms()[0].cell_count(), 16);

        assert_eq!(f.state(5, 5), BuildState::LEFT_LOWER_CORNER);
        assert_eq!(f.state(8, 8), BuildState::RIGHT_UPPER_CORNER);
        assert_eq!(f.state(5, 6), BuildState::WALL_LEFT);
        assert_eq!(f.state(8, 7), BuildState::WALL_RIGHT);
        assert_eq!(f.state(6, 5), BuildState::WALL_BOTTOM);
        assert_eq!(f.state(7, 8), BuildState::WALL_TOP);
        assert_eq!(f.state(6, 6), BuildState::INSIDE_ROOM);
        assert_eq!(f.state(4, 4), BuildState::EMPTY);
    }

    #[test]
    fn test_resize_debounced_on_same_cell() {
        let mut f = Fixture::new();
        let mut builder = MeshInstanceBuilder::new(&mut f.grid, &mut f.pool, &mut f.automaton);
        f.rooms
            .start_new_room_interaction_at_touched_cell(&mut builder, 1, CellCoord::new(2, 2));
        f.rooms
            .adjust_temporary_room_size(&mut builder, 1, CellCoord::new(5, 5));
        let before = builder.grid.texels();
        f.rooms
            .adjust_temporary_room_size(&mut builder, 1, CellCoord::new(5, 5));
        assert_eq!(builder.grid.texels(), before);
    }

    #[test]
    fn test_tap_without_drag_is_discarded() {
        let mut f = Fixture::new();
        assert!(!f.drag_room((3, 3), (3, 3)));
        assert!(f.state(3, 3).is_empty());
        assert!(f.rooms.is_first_room());
    }

    #[test]
    fn test_overlapping_room_collides() {
        let mut f = Fixture::new();
        assert!(f.drag_room((2, 2), (6, 6)));
        let mut candidate = Room::new(CellCoord::new(5, 5));
        candidate.update_corners(CellCoord::new(5, 5), CellCoord::new(9, 9));
        f.rooms.check_room_position(&f.grid, &mut candidate);
        assert!(candidate.collision);
        assert!(!f.drag_room((5, 5), (9, 9)));
        assert_eq!(f.rooms.rooms().len(), 1);
        assert_eq!(f.state(6, 6), BuildState::RIGHT_UPPER_CORNER, "committed room untouched");
        assert!(f.state(9, 9).is_empty());
    }

    #[test]
    fn test_detached_second_room_rejected() {
        let mut f = Fixture::new();
        assert!(f.drag_room((2, 2), (5, 5)));
        let mut candidate = Room::new(CellCoord::new(10, 10));
        candidate.update_corners(CellCoord::new(10, 10), CellCoord::new(13, 13));
        f.rooms.check_room_position(&f.grid, &mut candidate);
        assert!(!candidate.collision);
        assert!(!candidate.connected);
        assert!(!f.drag_room((10, 10), (13, 13)));
    }

    #[test]
    fn test_adjacent_room_commits_and_merges_walls() {
        let mut f = Fixture::new();
        assert!(f.drag_room((2, 2), (5, 5)));
        assert!(f.drag_room((6, 2), (9, 5)));
        assert_eq!(f.rooms.rooms().len(), 2);
        // Facing walls became interior; corners stay.
        for row in 3..=4 {
            assert_eq!(f.state(5, row), BuildState::INSIDE_ROOM);
            assert_eq!(f.state(6, row), BuildState::INSIDE_ROOM);
        }
        assert_eq!(f.state(5, 5), BuildState::RIGHT_UPPER_CORNER);
        assert_eq!(f.state(6, 2), BuildState::LEFT_LOWER_CORNER);
    }

    #[test]
    fn test_small_room_invalid() {
        let mut f = Fixture::new();
        assert!(!f.drag_room((2, 2), (3, 8)));
        assert!(f.rooms.rooms().is_empty());
    }

    #[test]
    fn test_near_infection_flagged() {
        let mut f = Fixture::new();
        f.builder()
            .build_at(CellCoord::new(7, 4), BuildState::INFECTED, BuildMode::Replace);
        let mut room = Room::new(CellCoord::new(2, 2));
        room.update_corners(CellCoord::new(2, 2), CellCoord::new(6, 6));
        f.rooms.check_room_position(&f.grid, &mut room);
        assert!(room.infected_neighbours);
        room.update_corners(CellCoord::new(2, 2), CellCoord::new(4, 4));
        f.rooms.check_room_position(&f.grid, &mut room);
        assert!(!room.infected_neighbours);
    }

    #[test]
    fn test_repair_infected_cell() {
        let mut f = Fixture::new();
        let c = CellCoord::new(10, 10);
        f.builder()
            .build_at(c, BuildState::INSIDE_ROOM_INFECTED, BuildMode::Replace);
        f.builder().update_health(c, 85);
        assert!(f.repair(c));
        assert_eq!(f.grid.cell_at(c).unwrap().health(), 95);
        assert!(f.state(10, 10).contains(BuildState::INFECTED));
        assert!(f.repair(c));
        assert_eq!(f.state(10, 10), BuildState::INSIDE_ROOM);
        assert_eq!(f.grid.cell_at(c).unwrap().health(), MAX_HEALTH);
    }

    #[test]
    fn test_repair_source_promotes_to_wall() {
        let mut f = Fixture::new();
        let c = CellCoord::new(10, 10);
        f.builder().build_at(
            c,
            BuildState::WALL_LEFT | BuildState::SOURCE | BuildState::INFECTED,
            BuildMode::Replace,
        );
        f.builder().update_health(c, 95);
        assert!(f.repair(c));
        assert_eq!(f.state(10, 10), BuildState::WALL_LEFT);
        let texel = f.automaton.latest_texture()[(10 * 20 + 10) as usize];
        assert_eq!(texel.build_state(), BuildState::WALL_LEFT);
    }

    #[test]
    fn test_repair_source_surrounded_is_noop() {
        let mut f = Fixture::new();
        let c = CellCoord::new(10, 10);
        let infected_source = BuildState::SOURCE | BuildState::INFECTED;
        f.builder().build_at(c, infected_source, BuildMode::Replace);
        f.builder().update_health(c, 10);
        for n in [(10, 11), (11, 10), (10, 9), (9, 10)] {
            f.builder()
                .build_at(CellCoord::new(n.0, n.1), infected_source, BuildMode::Replace);
        }
        let before = f.grid.texels();
        assert!(!f.repair(c));
        assert_eq!(f.grid.texels(), before);
    }

    #[test]
    fn test_repair_source_blocked_by_infected_neighbour() {
        let mut f = Fixture::new();
        let c = CellCoord::new(10, 10);
        f.builder().build_at(
            c,
            BuildState::SOURCE | BuildState::INFECTED,
            BuildMode::Replace,
        );
        f.builder().update_health(c, 10);
        f.builder().build_at(
            CellCoord::new(11, 10),
            BuildState::INSIDE_ROOM_INFECTED,
            BuildMode::Replace,
        );
        assert!(!f.repair(c));
        assert_eq!(f.grid.cell_at(c).unwrap().health(), 10);
    }

    #[test]
    fn test_touch_on_infected_cell_repairs() {
        let mut f = Fixture::new();
        let c = CellCoord::new(4, 4);
        f.builder()
            .build_at(c, BuildState::INSIDE_ROOM_INFECTED, BuildMode::Replace);
        f.builder().update_health(c, 0);
        let mut builder = MeshInstanceBuilder::new(&mut f.grid, &mut f.pool, &mut f.automaton);
        assert!(f
            .rooms
            .start_new_room_interaction_at_touched_cell(&mut builder, 3, c));
        assert_eq!(builder.grid.interaction_count(), 0);
        assert_eq!(builder.grid.cell_at(c).unwrap().health(), 10);
    }

    #[test]
    fn test_reset_clears_rooms() {
        let mut f = Fixture::new();
        assert!(f.drag_room((2, 2), (5, 5)));
        f.rooms.set_heal_amount(0.5);
        let mut builder = MeshInstanceBuilder::new(&mut f.grid, &mut f.pool, &mut f.automaton);
        f.rooms.reset(&mut builder);
        assert!(f.rooms.rooms().is_empty());
        assert!(f.rooms.is_first_room());
        assert_eq!(f.rooms.heal_amount(), 0.1);
        assert!(f.state(2, 2).is_empty());
        assert_eq!(f.pool.live_instance_count(), 0);
    }
}
