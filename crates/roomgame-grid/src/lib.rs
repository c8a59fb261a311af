pub mod cell;
pub mod grid;
pub mod hook;
pub mod interaction;
pub mod room;

pub use cell::{CellVertex, GridCell};
pub use grid::{BuildMode, CellPlacement, InteractiveGrid};
pub use hook::StateChangeHook;
pub use interaction::GridInteraction;
pub use room::Room;
