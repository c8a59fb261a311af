use crate::cell::GridCell;
use crate::grid::CellPlacement;
use roomgame_core::types::BuildState;

/// Side effects of a build-state change.
///
/// `InteractiveGrid::build_at` has already written the new state into
/// `cell` when this runs; `previous` is the state before the change.
pub trait StateChangeHook {
    fn on_state_change(&mut self, cell: &mut GridCell, previous: BuildState, placement: CellPlacement);
}

/// No side effects. Used by slaves and plain grid tests.
impl StateChangeHook for () {
    fn on_state_change(&mut self, _: &mut GridCell, _: BuildState, _: CellPlacement) {}
}

impl<T: StateChangeHook + ?Sized> StateChangeHook for &mut T {
    fn on_state_change(&mut self, cell: &mut GridCell, previous: BuildState, placement: CellPlacement) {
        (**self).on_state_change(cell, previous, placement);
    }
}

/// Runs `A` then `B`.
impl<A: StateChangeHook, B: StateChangeHook> StateChangeHook for (A, B) {
    fn on_state_change(&mut self, cell: &mut GridCell, previous: BuildState, placement: CellPlacement) {
        self.0.on_state_change(cell, previous, placement);
        self.1.on_state_change(cell, previous, placement);
    }
}
