//! Single source of truth for shared constants.
//! Values that shaders read (health range, instance layout) are mirrored
//! into the uniform block by the render crate.

/// Default number of grid columns.
pub const GRID_COLUMNS: u32 = 64;

/// Default number of grid rows.
pub const GRID_ROWS: u32 = 64;

/// Grid height in world units. Cell size is `GRID_HEIGHT_UNITS / rows`.
pub const GRID_HEIGHT_UNITS: f32 = 2.0;

/// Lower-left corner of the grid in grid-local space.
pub const GRID_ORIGIN: f32 = -1.0;

/// Lowest health a cell can reach.
pub const MIN_HEALTH: i32 = 0;

/// Health of an untouched or freshly built cell.
pub const MAX_HEALTH: i32 = 100;

/// Fraction of the health range restored by a single repair touch.
pub const DEFAULT_HEAL_AMOUNT: f32 = 0.1;

/// Mesh instances are scaled by `cell_size / INSTANCE_SCALE_DIVISOR`.
/// Slightly below 2 so neighbouring segments overlap by a hair.
pub const INSTANCE_SCALE_DIVISOR: f32 = 1.98;

/// Smallest room edge length (in cells) that can be committed.
pub const MIN_ROOM_SPAN: u32 = 3;

/// Seconds between two automaton transitions.
pub const DEFAULT_TRANSITION_TIME: f32 = 0.04;

/// Fraction of simulated neighbours at which an empty cell becomes simulated.
pub const DEFAULT_BIRTH_THRESHOLD: f32 = 0.4;

/// Fraction of non-simulated neighbours above which a simulated cell dies.
pub const DEFAULT_DEATH_THRESHOLD: f32 = 0.5;

/// Fraction of simulated neighbours at which fluid piles up against a room.
pub const DEFAULT_COLLISION_THRESHOLD: f32 = 0.2;

/// Simulated neighbours needed before a wall starts taking damage.
pub const DEFAULT_OUTER_INFLUENCE_NEIGHBOR_THRESHOLD: u32 = 2;

/// Health removed per damaging neighbour and transition.
pub const DEFAULT_DAMAGE_PER_CELL: i32 = 5;

/// Radius (in cells) of the simulated disc placed by a click in placement mode.
pub const POPULATE_CIRCLE_RADIUS: f32 = 5.0;

/// Outer influence action progress gained per second. An action completes at 1.0.
pub const OUTER_INFLUENCE_ACTION_RATE: f32 = 0.1;

/// Outer influence movement speed factor applied to the target offset.
pub const OUTER_INFLUENCE_SPEED: f32 = 0.1;

/// Patrol mode roll: `max(rand % MODULUS - OFFSET, 0)`.
pub const OUTER_INFLUENCE_ROLL_MODULUS: u32 = 6;

/// See [`OUTER_INFLUENCE_ROLL_MODULUS`].
pub const OUTER_INFLUENCE_ROLL_OFFSET: i32 = 4;

/// Seconds between two slow updates of the game logic.
pub const SLOW_UPDATE_INTERVAL: f32 = 0.1;

/// Upper bound on a single frame delta in seconds.
pub const MAX_FRAME_DELTA: f32 = 0.25;

/// Texture unit the latest automaton state is bound to.
pub const GRID_TEXTURE_UNIT: u32 = 0;

/// Texture unit the previous automaton state is bound to.
pub const GRID_PREV_TEXTURE_UNIT: u32 = 1;
