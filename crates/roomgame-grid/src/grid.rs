use std::ops::ControlFlow;

use crate::cell::{CellVertex, GridCell};
use crate::hook::StateChangeHook;
use crate::interaction::GridInteraction;
use glam::{Mat4, Vec2, Vec3};
use roomgame_core::constants::{GRID_ORIGIN, INSTANCE_SCALE_DIVISOR};
use roomgame_core::direction::{Direction, ALL_DIRECTIONS};
use roomgame_core::error::{RoomgameError, SyncError};
use roomgame_core::sync::{SharedState, SyncDecoder, SyncEncoder};
use roomgame_core::types::{BuildState, CellCoord, CellTexel};

/// How `build_at` combines the requested bits with the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// `current | bits`
    Additive,
    /// `bits`
    Replace,
    /// `current & !bits`
    RemoveSpecific,
}

impl BuildMode {
    pub fn apply(self, current: BuildState, bits: BuildState) -> BuildState {
        match self {
            BuildMode::Additive => current | bits,
            BuildMode::Replace => bits,
            BuildMode::RemoveSpecific => current & !bits,
        }
    }
}

/// World-space transform of a cell's mesh instances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPlacement {
    pub center: Vec3,
    pub scale: f32,
}

/// Fixed-size 2D grid of cells with spatial queries for input picking.
///
/// Cells live in one column-major arena (`col * rows + row`). Neighbour
/// links are coordinates into that arena.
pub struct InteractiveGrid {
    columns: u32,
    rows: u32,
    cell_size: f32,
    cells: Vec<GridCell>,
    /// Grid-local to world offset.
    translation: Vec3,
    /// Last view-projection used to map world positions to NDC.
    view_projection: Mat4,
    interactions: Vec<GridInteraction>,
    vertex_dirty: Vec<bool>,
    dirty_count: usize,
}

impl InteractiveGrid {
    /// Build a `columns` x `rows` grid whose height is `height_units`.
    pub fn new(columns: u32, rows: u32, height_units: f32) -> Result<Self, RoomgameError> {
        if columns == 0 || rows == 0 {
            return Err(RoomgameError::InvalidGridDimensions(format!(
                "{columns}x{rows}"
            )));
        }
        if !(height_units > 0.0) {
            return Err(RoomgameError::InvalidGridDimensions(format!(
                "height {height_units}"
            )));
        }
        let cell_size = height_units / rows as f32;

        let mut cells = Vec::with_capacity((columns * rows) as usize);
        for col in 0..columns {
            for row in 0..rows {
                let coord = CellCoord::new(col, row);
                let mut neighbors = [None; 4];
                for dir in ALL_DIRECTIONS {
                    let off = dir.offset();
                    let c = col as i32 + off.x;
                    let r = row as i32 + off.y;
                    if c >= 0 && r >= 0 && (c as u32) < columns && (r as u32) < rows {
                        neighbors[dir.index()] = Some(CellCoord::new(c as u32, r as u32));
                    }
                }
                let position = Vec2::new(
                    GRID_ORIGIN + col as f32 * cell_size,
                    GRID_ORIGIN + row as f32 * cell_size,
                );
                cells.push(GridCell::new(coord, position, neighbors));
            }
        }

        log::info!(
            "InteractiveGrid: {}x{} cells, cell size {:.4}",
            columns,
            rows,
            cell_size
        );

        let count = cells.len();
        Ok(Self {
            columns,
            rows,
            cell_size,
            cells,
            translation: Vec3::ZERO,
            view_projection: Mat4::IDENTITY,
            interactions: Vec::new(),
            vertex_dirty: vec![true; count],
            dirty_count: count,
        })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    /// Remember the camera used for the current frame's input picking.
    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    /// Arena index of a cell, or None if out of bounds.
    pub fn index_of(&self, coord: CellCoord) -> Option<usize> {
        if coord.col < self.columns && coord.row < self.rows {
            Some((coord.col * self.rows + coord.row) as usize)
        } else {
            None
        }
    }

    /// Bounds-checked direct lookup.
    pub fn cell_at(&self, coord: CellCoord) -> Option<&GridCell> {
        self.index_of(coord).map(|i| &self.cells[i])
    }

    pub fn state_at(&self, coord: CellCoord) -> Option<BuildState> {
        self.cell_at(coord).map(|c| c.build_state())
    }

    /// Neighbour of `coord` in `dir`, if both exist.
    pub fn neighbor_of(&self, coord: CellCoord, dir: Direction) -> Option<&GridCell> {
        let next = self.cell_at(coord)?.neighbor(dir)?;
        self.cell_at(next)
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Grid-local lower-left corner of a cell.
    pub fn cell_position(&self, coord: CellCoord) -> Vec2 {
        Vec2::new(
            GRID_ORIGIN + coord.col as f32 * self.cell_size,
            GRID_ORIGIN + coord.row as f32 * self.cell_size,
        )
    }

    /// Grid-local center of a cell.
    pub fn cell_center(&self, coord: CellCoord) -> Vec2 {
        self.cell_position(coord) + Vec2::splat(self.cell_size * 0.5)
    }

    /// World transform for the mesh instances of a cell.
    pub fn placement(&self, coord: CellCoord) -> CellPlacement {
        let center = self.cell_center(coord);
        CellPlacement {
            center: self.translation + center.extend(0.0),
            scale: self.cell_size / INSTANCE_SCALE_DIVISOR,
        }
    }

    /// Project a grid-local point to normalized device coordinates.
    pub fn ndc(&self, local: Vec2) -> Vec2 {
        self.view_projection
            .project_point3(self.translation + local.extend(0.0))
            .truncate()
    }

    fn ndc_bounds(&self, corners: [Vec2; 4]) -> (Vec2, Vec2) {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for corner in corners {
            let p = self.ndc(corner);
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }

    fn local_rect_corners(lower: Vec2, upper: Vec2) -> [Vec2; 4] {
        [
            lower,
            Vec2::new(upper.x, lower.y),
            Vec2::new(lower.x, upper.y),
            upper,
        ]
    }

    /// True if the NDC point lies within the projected grid bounds.
    pub fn is_inside_grid(&self, ndc: Vec2) -> bool {
        let lower = Vec2::splat(GRID_ORIGIN);
        let upper = lower
            + Vec2::new(
                self.columns as f32 * self.cell_size,
                self.rows as f32 * self.cell_size,
            );
        let (min, max) = self.ndc_bounds(Self::local_rect_corners(lower, upper));
        ndc.x >= min.x && ndc.x <= max.x && ndc.y >= min.y && ndc.y <= max.y
    }

    /// True if the NDC point lies within the projected bounds of a cell.
    pub fn is_inside_cell(&self, ndc: Vec2, coord: CellCoord) -> bool {
        let lower = self.cell_position(coord);
        let upper = lower + Vec2::splat(self.cell_size);
        let (min, max) = self.ndc_bounds(Self::local_rect_corners(lower, upper));
        ndc.x >= min.x && ndc.x <= max.x && ndc.y >= min.y && ndc.y <= max.y
    }

    /// Find the cell under an NDC point by binary search over cell edges.
    ///
    /// Falls back to the cell the search converged on when no neighbouring
    /// cell contains the point exactly.
    pub fn cell_at_ndc(&self, ndc: Vec2) -> Option<CellCoord> {
        if !self.is_inside_grid(ndc) {
            return None;
        }

        // Invariant: edge(lo) <= ndc < edge(hi) along each axis.
        let (mut lo_c, mut hi_c) = (0u32, self.columns);
        let (mut lo_r, mut hi_r) = (0u32, self.rows);
        while hi_c - lo_c > 1 || hi_r - lo_r > 1 {
            let mid_row_y = GRID_ORIGIN + (lo_r + hi_r) as f32 * 0.5 * self.cell_size;
            let mid_col_x = GRID_ORIGIN + (lo_c + hi_c) as f32 * 0.5 * self.cell_size;
            if hi_c - lo_c > 1 {
                let mid = (lo_c + hi_c) / 2;
                let edge = self.ndc(Vec2::new(GRID_ORIGIN + mid as f32 * self.cell_size, mid_row_y));
                if ndc.x < edge.x {
                    hi_c = mid;
                } else {
                    lo_c = mid;
                }
            }
            if hi_r - lo_r > 1 {
                let mid = (lo_r + hi_r) / 2;
                let edge = self.ndc(Vec2::new(mid_col_x, GRID_ORIGIN + mid as f32 * self.cell_size));
                if ndc.y < edge.y {
                    hi_r = mid;
                } else {
                    lo_r = mid;
                }
            }
        }

        // Perspective can skew edges; check the immediate neighbourhood.
        let col_end = (lo_c + 1).min(self.columns - 1);
        let row_end = (lo_r + 1).min(self.rows - 1);
        for col in lo_c.saturating_sub(1)..=col_end {
            for row in lo_r.saturating_sub(1)..=row_end {
                let coord = CellCoord::new(col, row);
                if self.is_inside_cell(ndc, coord) {
                    return Some(coord);
                }
            }
        }
        Some(CellCoord::new(lo_c, lo_r))
    }

    /// Intersect a ray with the grid plane and look up the cell it hits.
    pub fn pick_cell(&self, ray_origin: Vec3, ray_second_point: Vec3) -> Option<CellCoord> {
        let dir = ray_second_point - ray_origin;
        if dir.z.abs() < f32::EPSILON {
            return None;
        }
        let t = (self.translation.z - ray_origin.z) / dir.z;
        if t < 0.0 {
            return None;
        }
        let hit = ray_origin + dir * t;
        let ndc = self.view_projection.project_point3(hit).truncate();
        self.cell_at_ndc(ndc)
    }

    /// Visit every cell in column-major order.
    pub fn for_each_cell(&self, mut f: impl FnMut(&GridCell)) {
        for cell in &self.cells {
            f(cell);
        }
    }

    /// Visit cells in column-major order until `f` breaks.
    /// Returns true if the traversal was stopped early.
    pub fn for_each_cell_until(&self, mut f: impl FnMut(&GridCell) -> ControlFlow<()>) -> bool {
        for cell in &self.cells {
            if f(cell).is_break() {
                return true;
            }
        }
        false
    }

    /// Visit the inclusive rectangle `lower..=upper`, column-major.
    /// Does nothing if `lower` exceeds `upper` on either axis.
    pub fn for_each_cell_in_range(
        &self,
        lower: CellCoord,
        upper: CellCoord,
        mut f: impl FnMut(&GridCell),
    ) {
        if lower.col > upper.col || lower.row > upper.row {
            return;
        }
        let max_col = upper.col.min(self.columns.saturating_sub(1));
        let max_row = upper.row.min(self.rows.saturating_sub(1));
        for col in lower.col..=max_col {
            for row in lower.row..=max_row {
                if let Some(cell) = self.cell_at(CellCoord::new(col, row)) {
                    f(cell);
                }
            }
        }
    }

    /// Closest cell (by center distance to a grid-local point) matching `pred`.
    pub fn closest_cell_where(
        &self,
        point: Vec2,
        mut pred: impl FnMut(&GridCell) -> bool,
    ) -> Option<CellCoord> {
        let mut best: Option<(f32, CellCoord)> = None;
        for cell in &self.cells {
            if !pred(cell) {
                continue;
            }
            let d = self.cell_center(cell.coord()).distance_squared(point);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, cell.coord()));
            }
        }
        best.map(|(_, c)| c)
    }

    /// True if every cell of `col` between the two rows (inclusive) is EMPTY.
    pub fn is_column_empty_between(&self, col: u32, row_a: u32, row_b: u32) -> bool {
        let (lo, hi) = (row_a.min(row_b), row_a.max(row_b));
        (lo..=hi).all(|row| {
            self.state_at(CellCoord::new(col, row))
                .is_some_and(|s| s.is_empty())
        })
    }

    /// True if every cell of `row` between the two columns (inclusive) is EMPTY.
    pub fn is_row_empty_between(&self, row: u32, col_a: u32, col_b: u32) -> bool {
        let (lo, hi) = (col_a.min(col_b), col_a.max(col_b));
        (lo..=hi).all(|col| {
            self.state_at(CellCoord::new(col, row))
                .is_some_and(|s| s.is_empty())
        })
    }

    /// The single entry point for changing a cell's build state.
    ///
    /// Returns false (and runs no side effects) if the cell is out of bounds
    /// or the resulting state equals the current one.
    pub fn build_at<H: StateChangeHook + ?Sized>(
        &mut self,
        coord: CellCoord,
        bits: BuildState,
        mode: BuildMode,
        hook: &mut H,
    ) -> bool {
        let Some(index) = self.index_of(coord) else {
            return false;
        };
        let placement = self.placement(coord);
        let cell = &mut self.cells[index];
        let previous = cell.build_state;
        let next = mode.apply(previous, bits);
        if next == previous {
            return false;
        }
        cell.build_state = next;
        hook.on_state_change(cell, previous, placement);
        self.mark_dirty(index);
        true
    }

    /// Run `f` on a cell's mutable record (instances, health). The build
    /// state stays read-only here; use `build_at` for that.
    pub fn with_cell_mut<R>(
        &mut self,
        coord: CellCoord,
        f: impl FnOnce(&mut GridCell, CellPlacement) -> R,
    ) -> Option<R> {
        let index = self.index_of(coord)?;
        let placement = self.placement(coord);
        let result = f(&mut self.cells[index], placement);
        self.mark_dirty(index);
        Some(result)
    }

    /// Set the health of a cell. Returns false if out of bounds.
    pub fn set_health(&mut self, coord: CellCoord, health: i32) -> bool {
        let Some(index) = self.index_of(coord) else {
            return false;
        };
        if self.cells[index].health() != health {
            self.cells[index].set_health(health);
            self.mark_dirty(index);
        }
        true
    }

    fn mark_dirty(&mut self, index: usize) {
        if !self.vertex_dirty[index] {
            self.vertex_dirty[index] = true;
            self.dirty_count += 1;
        }
    }

    pub fn has_dirty_vertices(&self) -> bool {
        self.dirty_count > 0
    }

    /// Drain the debug vertices changed since the last call, with their
    /// arena index.
    pub fn take_dirty_vertices(&mut self) -> Vec<(u32, CellVertex)> {
        let mut out = Vec::with_capacity(self.dirty_count);
        for (index, dirty) in self.vertex_dirty.iter_mut().enumerate() {
            if *dirty {
                *dirty = false;
                out.push((index as u32, self.cells[index].vertex()));
            }
        }
        self.dirty_count = 0;
        out
    }

    pub fn interaction(&self, touch_id: u32) -> Option<&GridInteraction> {
        self.interactions.iter().find(|i| i.touch_id == touch_id)
    }

    /// Register a gesture. Refused if `touch_id` already has one.
    pub fn push_interaction(&mut self, interaction: GridInteraction) -> bool {
        if self.interaction(interaction.touch_id).is_some() {
            return false;
        }
        self.interactions.push(interaction);
        true
    }

    pub fn remove_interaction(&mut self, touch_id: u32) -> Option<GridInteraction> {
        let pos = self.interactions.iter().position(|i| i.touch_id == touch_id)?;
        Some(self.interactions.remove(pos))
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    /// Column-major `(state, health)` snapshot of every cell.
    pub fn texels(&self) -> Vec<CellTexel> {
        self.cells
            .iter()
            .map(|c| CellTexel::new(c.build_state(), c.health()))
            .collect()
    }
}

impl SharedState for InteractiveGrid {
    fn encode(&self, encoder: &mut SyncEncoder) {
        encoder.write_f32(self.translation.x);
        encoder.write_f32(self.translation.y);
        encoder.write_f32(self.translation.z);
        encoder.write_pod_slice(&self.texels());
    }

    fn decode(&mut self, decoder: &mut SyncDecoder<'_>) -> Result<(), SyncError> {
        let translation = Vec3::new(decoder.read_f32()?, decoder.read_f32()?, decoder.read_f32()?);
        let texels: Vec<CellTexel> = decoder.read_pod_vec()?;
        if texels.len() != self.cells.len() {
            return Err(SyncError::LengthMismatch {
                what: "grid cells",
                expected: self.cells.len(),
                actual: texels.len(),
            });
        }
        self.translation = translation;
        for (index, texel) in texels.into_iter().enumerate() {
            let cell = &mut self.cells[index];
            if cell.build_state != texel.build_state() || cell.health() != texel.health {
                cell.build_state = texel.build_state();
                cell.set_health(texel.health);
                self.mark_dirty(index);
            }
        }
        Ok(())
    }
}
