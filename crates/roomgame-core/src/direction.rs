use crate::types::BuildState;
use glam::IVec2;

/// One of the four edge-adjacent neighbour directions on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

/// All four directions, in neighbour-slot order.
pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

/// All eight directions (edges and diagonals) used for neighbourhood counts.
pub const MOORE_OFFSETS: [IVec2; 8] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// Wall-facing directions checked when merging walls, in fixed order.
/// A wall with the RIGHT bit faces east, and so on.
pub const WALL_FACINGS: [(BuildState, Direction); 4] = [
    (BuildState::RIGHT, Direction::East),
    (BuildState::LEFT, Direction::West),
    (BuildState::TOP, Direction::North),
    (BuildState::BOTTOM, Direction::South),
];

impl Direction {
    /// Offset in (column, row). North is +row.
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, 1),
            Direction::East => IVec2::new(1, 0),
            Direction::South => IVec2::new(0, -1),
            Direction::West => IVec2::new(-1, 0),
        }
    }

    /// Index into a cell's neighbour array.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}
