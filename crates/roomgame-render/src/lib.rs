pub mod builder;
pub mod debug_points;
pub mod instance;
pub mod mesh;
pub mod pool;
pub mod uniforms;

pub use builder::{AutomatonNotify, MeshInstanceBuilder, MeshInstancing};
pub use debug_points::GridDebugBuffer;
pub use instance::MeshInstance;
pub use mesh::RoomSegmentMesh;
pub use pool::{DrawCall, RoomSegmentMeshPool};
pub use uniforms::{FrameUniforms, UniformBlock, UniformValue};
