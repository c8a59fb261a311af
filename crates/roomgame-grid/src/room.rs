use crate::grid::{BuildMode, InteractiveGrid};
use crate::hook::StateChangeHook;
use roomgame_core::types::{BuildState, CellCoord};

/// Axis-aligned rectangle of cells, either being sized by a gesture
/// (temporary) or committed.
#[derive(Debug, Clone)]
pub struct Room {
    left_lower: CellCoord,
    right_upper: CellCoord,
    pub collision: bool,
    pub connected: bool,
    pub infected_neighbours: bool,
    pub is_valid: bool,
    pub is_temporary: bool,
    /// Bits this room added to each cell while temporary, so clearing
    /// never strips bits owned by something else.
    marks: Vec<(CellCoord, BuildState)>,
}

impl Room {
    /// A one-cell temporary room.
    pub fn new(start: CellCoord) -> Self {
        Self {
            left_lower: start,
            right_upper: start,
            collision: false,
            connected: false,
            infected_neighbours: false,
            is_valid: false,
            is_temporary: true,
            marks: Vec::new(),
        }
    }

    /// Span the room between two opposite corners, in any order.
    pub fn update_corners(&mut self, a: CellCoord, b: CellCoord) {
        self.left_lower = CellCoord::new(a.col.min(b.col), a.row.min(b.row));
        self.right_upper = CellCoord::new(a.col.max(b.col), a.row.max(b.row));
    }

    pub fn left_lower(&self) -> CellCoord {
        self.left_lower
    }

    pub fn right_upper(&self) -> CellCoord {
        self.right_upper
    }

    pub fn col_span(&self) -> u32 {
        self.right_upper.col - self.left_lower.col + 1
    }

    pub fn row_span(&self) -> u32 {
        self.right_upper.row - self.left_lower.row + 1
    }

    pub fn cell_count(&self) -> u32 {
        self.col_span() * self.row_span()
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.col >= self.left_lower.col
            && coord.col <= self.right_upper.col
            && coord.row >= self.left_lower.row
            && coord.row <= self.right_upper.row
    }

    /// Inclusive rectangle overlap.
    pub fn overlaps(&self, other: &Room) -> bool {
        self.left_lower.col <= other.right_upper.col
            && other.left_lower.col <= self.right_upper.col
            && self.left_lower.row <= other.right_upper.row
            && other.left_lower.row <= self.right_upper.row
    }

    /// True if one of this room's walls sits directly against a wall of
    /// `other`, with at least one non-corner cell facing a non-corner cell.
    /// These are exactly the wall pairs that merge on commit.
    pub fn connects_to(&self, other: &Room) -> bool {
        let wall_rows = |r: &Room| (r.left_lower.row + 1, r.right_upper.row.saturating_sub(1));
        let wall_cols = |r: &Room| (r.left_lower.col + 1, r.right_upper.col.saturating_sub(1));
        let overlap = |a: (u32, u32), b: (u32, u32)| a.0.max(b.0) <= a.1.min(b.1);

        let side_by_side = (self.left_lower.col == other.right_upper.col + 1
            || other.left_lower.col == self.right_upper.col + 1)
            && overlap(wall_rows(self), wall_rows(other));
        let stacked = (self.left_lower.row == other.right_upper.row + 1
            || other.left_lower.row == self.right_upper.row + 1)
            && overlap(wall_cols(self), wall_cols(other));
        side_by_side || stacked
    }

    /// Role bits of a cell inside this room. EMPTY if outside.
    pub fn cell_role(&self, coord: CellCoord) -> BuildState {
        if !self.contains(coord) {
            return BuildState::EMPTY;
        }
        let left = coord.col == self.left_lower.col;
        let right = coord.col == self.right_upper.col;
        let bottom = coord.row == self.left_lower.row;
        let top = coord.row == self.right_upper.row;
        match (left, right, bottom, top) {
            (true, _, true, _) => BuildState::LEFT_LOWER_CORNER,
            (true, _, _, true) => BuildState::LEFT_UPPER_CORNER,
            (_, true, true, _) => BuildState::RIGHT_LOWER_CORNER,
            (_, true, _, true) => BuildState::RIGHT_UPPER_CORNER,
            (true, _, _, _) => BuildState::WALL_LEFT,
            (_, true, _, _) => BuildState::WALL_RIGHT,
            (_, _, true, _) => BuildState::WALL_BOTTOM,
            (_, _, _, true) => BuildState::WALL_TOP,
            _ => BuildState::INSIDE_ROOM,
        }
    }

    /// Cells of the room in column-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let (ll, ru) = (self.left_lower, self.right_upper);
        (ll.col..=ru.col).flat_map(move |col| (ll.row..=ru.row).map(move |row| CellCoord::new(col, row)))
    }

    /// Cells of the ring one cell outside the room, clipped to the grid.
    pub fn surrounding_cells(&self, columns: u32, rows: u32) -> Vec<CellCoord> {
        let lo_col = self.left_lower.col as i64 - 1;
        let hi_col = self.right_upper.col as i64 + 1;
        let lo_row = self.left_lower.row as i64 - 1;
        let hi_row = self.right_upper.row as i64 + 1;
        let mut ring = Vec::new();
        for col in lo_col..=hi_col {
            for row in lo_row..=hi_row {
                let on_ring = col == lo_col || col == hi_col || row == lo_row || row == hi_row;
                if on_ring && col >= 0 && row >= 0 && col < columns as i64 && row < rows as i64 {
                    ring.push(CellCoord::new(col as u32, row as u32));
                }
            }
        }
        ring
    }

    /// Recompute `is_valid` from the collision and connection flags.
    pub fn check_validity(&mut self, first_room: bool, min_span: u32) {
        let big_enough = self.col_span() >= min_span && self.row_span() >= min_span;
        self.is_valid = !self.collision && (self.connected || first_room) && big_enough;
    }

    /// Record bits added to a cell on behalf of this room.
    pub fn mark<H: StateChangeHook + ?Sized>(
        &mut self,
        grid: &mut InteractiveGrid,
        coord: CellCoord,
        bits: BuildState,
        hook: &mut H,
    ) {
        let Some(before) = grid.state_at(coord) else {
            return;
        };
        let added = bits & !before;
        if grid.build_at(coord, bits, BuildMode::Additive, hook) && !added.is_empty() {
            self.marks.push((coord, added));
        }
    }

    /// Write every cell's role into the grid. Temporary rooms also carry
    /// TEMPORARY, plus INVALID while invalid.
    pub fn fill<H: StateChangeHook + ?Sized>(
        &mut self,
        grid: &mut InteractiveGrid,
        temporary: bool,
        hook: &mut H,
    ) {
        let mut extra = BuildState::EMPTY;
        if temporary {
            extra |= BuildState::TEMPORARY;
            if !self.is_valid {
                extra |= BuildState::INVALID;
            }
        }
        let coords: Vec<CellCoord> = self.cells().collect();
        for coord in coords {
            let bits = self.cell_role(coord) | extra;
            self.mark(grid, coord, bits, hook);
        }
        self.is_temporary = temporary;
    }

    /// Remove everything this room added to the grid.
    pub fn clear<H: StateChangeHook + ?Sized>(&mut self, grid: &mut InteractiveGrid, hook: &mut H) {
        for (coord, added) in std::mem::take(&mut self.marks) {
            grid.build_at(coord, added, BuildMode::RemoveSpecific, hook);
        }
    }

    /// Commit: the room stops tracking its markings.
    pub fn finish(&mut self) {
        self.is_temporary = false;
        self.marks.clear();
    }

    pub fn has_marks(&self) -> bool {
        !self.marks.is_empty()
    }
}
