pub mod config;
pub mod gpu_errors;
pub mod input;
pub mod outer_influence;
pub mod room_manager;
pub mod session;

pub use config::{ConfigError, GameConfig};
pub use gpu_errors::{ErrorDeduplicator, GpuErrorWatch};
pub use input::{
    InputAction, InputState, InteractionMode, Key, PointerEvent, PointerPhase, PointerPosition,
};
pub use outer_influence::{OuterInfluence, OuterInfluenceMode};
pub use room_manager::RoomInteractionManager;
pub use session::{standard_mesh_pool, RoomGame};
