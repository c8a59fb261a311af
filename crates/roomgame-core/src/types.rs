use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};

/// Role of a grid cell as a bitmask. Several bits may be set at once
/// (a repairable wall is `WALL | LEFT | SOURCE | INFECTED`). `EMPTY` is
/// the all-zero mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BuildState(pub u32);

impl BuildState {
    pub const EMPTY: Self = Self(0);
    pub const INSIDE_ROOM: Self = Self(1 << 0);
    pub const LEFT: Self = Self(1 << 1);
    pub const RIGHT: Self = Self(1 << 2);
    pub const TOP: Self = Self(1 << 3);
    pub const BOTTOM: Self = Self(1 << 4);
    pub const WALL: Self = Self(1 << 5);
    pub const CORNER: Self = Self(1 << 6);
    pub const INVALID: Self = Self(1 << 7);
    pub const TEMPORARY: Self = Self(1 << 8);
    pub const SOURCE: Self = Self(1 << 9);
    pub const INFECTED: Self = Self(1 << 10);
    pub const OUTER_INFLUENCE: Self = Self(1 << 11);
    pub const SIMULATED_STATE: Self = Self(1 << 12);

    pub const WALL_LEFT: Self = Self(Self::WALL.0 | Self::LEFT.0);
    pub const WALL_RIGHT: Self = Self(Self::WALL.0 | Self::RIGHT.0);
    pub const WALL_TOP: Self = Self(Self::WALL.0 | Self::TOP.0);
    pub const WALL_BOTTOM: Self = Self(Self::WALL.0 | Self::BOTTOM.0);

    pub const LEFT_LOWER_CORNER: Self = Self(Self::CORNER.0 | Self::LEFT.0 | Self::BOTTOM.0);
    pub const LEFT_UPPER_CORNER: Self = Self(Self::CORNER.0 | Self::LEFT.0 | Self::TOP.0);
    pub const RIGHT_LOWER_CORNER: Self = Self(Self::CORNER.0 | Self::RIGHT.0 | Self::BOTTOM.0);
    pub const RIGHT_UPPER_CORNER: Self = Self(Self::CORNER.0 | Self::RIGHT.0 | Self::TOP.0);

    pub const INSIDE_ROOM_INFECTED: Self = Self(Self::INSIDE_ROOM.0 | Self::INFECTED.0);

    /// Bits that survive when two facing walls merge into room interior.
    pub const MERGE_PRESERVED: Self = Self(
        Self::INVALID.0 | Self::SOURCE.0 | Self::INFECTED.0 | Self::OUTER_INFLUENCE.0,
    );

    /// Any bit that makes a cell part of a room outline or interior.
    pub const ROOM_PART: Self = Self(Self::INSIDE_ROOM.0 | Self::WALL.0 | Self::CORNER.0);

    /// All directional bits.
    pub const DIRECTIONS: Self = Self(Self::LEFT.0 | Self::RIGHT.0 | Self::TOP.0 | Self::BOTTOM.0);

    /// Names used by the `Debug` impl, in bit order.
    const NAMES: [(&'static str, BuildState); 13] = [
        ("INSIDE_ROOM", Self::INSIDE_ROOM),
        ("LEFT", Self::LEFT),
        ("RIGHT", Self::RIGHT),
        ("TOP", Self::TOP),
        ("BOTTOM", Self::BOTTOM),
        ("WALL", Self::WALL),
        ("CORNER", Self::CORNER),
        ("INVALID", Self::INVALID),
        ("TEMPORARY", Self::TEMPORARY),
        ("SOURCE", Self::SOURCE),
        ("INFECTED", Self::INFECTED),
        ("OUTER_INFLUENCE", Self::OUTER_INFLUENCE),
        ("SIMULATED_STATE", Self::SIMULATED_STATE),
    ];

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if at least one bit of `other` is set in `self`.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for BuildState {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for BuildState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for BuildState {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for BuildState {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitXor for BuildState {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for BuildState {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        let mut first = true;
        for (name, bit) in Self::NAMES {
            if self.contains(bit) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Integer (column, row) address of a grid cell. Column grows east, row grows north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct CellCoord {
    pub col: u32,
    pub row: u32,
}

impl CellCoord {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// Newtype for mesh identifiers inside a mesh pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeshId(pub u32);

/// Handle to one reserved slot in a mesh's instance buffer.
/// Owned by the cell that reserved it and released on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceBufferRange {
    pub mesh: MeshId,
    pub offset: u32,
}

/// Per-cell automaton record as laid out in the state textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct CellTexel {
    pub state: u32,
    pub health: i32,
}

impl CellTexel {
    pub fn new(state: BuildState, health: i32) -> Self {
        Self {
            state: state.0,
            health,
        }
    }

    pub fn build_state(self) -> BuildState {
        BuildState(self.state)
    }
}
