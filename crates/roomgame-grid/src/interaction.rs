use crate::room::Room;
use roomgame_core::types::CellCoord;

/// One in-progress pointer gesture on the grid.
#[derive(Debug, Clone)]
pub struct GridInteraction {
    pub touch_id: u32,
    pub start_cell: CellCoord,
    /// Cell the pointer was over at the last resize, for debouncing.
    pub last_cell: CellCoord,
    pub room: Room,
}

impl GridInteraction {
    pub fn new(touch_id: u32, start_cell: CellCoord) -> Self {
        Self {
            touch_id,
            start_cell,
            last_cell: start_cell,
            room: Room::new(start_cell),
        }
    }
}
