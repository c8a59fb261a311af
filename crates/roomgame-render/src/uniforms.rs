use glam::{UVec2, Vec3};

/// Per-frame values the uniform callbacks read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub time: f32,
    pub automaton_time_delta: f32,
    pub grid_dimensions: UVec2,
    pub grid_translation: Vec3,
    pub grid_cell_size: f32,
}

/// Value produced by a uniform update callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    UVec2(UVec2),
    Vec3(Vec3),
    /// Texture bound to the given unit.
    TextureUnit(u32),
}

/// Uniform names shared with the room segment shader.
pub mod names {
    pub const TIME: &str = "t_sec";
    pub const AUTOMATON_TIME_DELTA: &str = "automatonTimeDelta";
    pub const GRID_TEX: &str = "gridTex";
    pub const GRID_TEX_PREV: &str = "gridTex_PrevState";
    pub const GRID_DIMENSIONS: &str = "gridDimensions";
    pub const GRID_TRANSLATION: &str = "gridTranslation";
    pub const GRID_CELL_SIZE: &str = "gridCellSize";
}

/// GPU layout of the room segment uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub grid_translation: [f32; 3],
    pub t_sec: f32,
    pub grid_dimensions: [u32; 2],
    pub grid_cell_size: f32,
    pub automaton_time_delta: f32,
    pub grid_tex_unit: u32,
    pub grid_tex_prev_unit: u32,
    pub _pad: [u32; 2],
}

impl UniformBlock {
    /// Assemble the block from named values; unknown names are ignored.
    pub fn from_values<'a>(values: impl IntoIterator<Item = (&'a str, UniformValue)>) -> Self {
        let mut block = Self::default();
        for (name, value) in values {
            match (name, value) {
                (names::TIME, UniformValue::Float(v)) => block.t_sec = v,
                (names::AUTOMATON_TIME_DELTA, UniformValue::Float(v)) => block.automaton_time_delta = v,
                (names::GRID_CELL_SIZE, UniformValue::Float(v)) => block.grid_cell_size = v,
                (names::GRID_DIMENSIONS, UniformValue::UVec2(v)) => block.grid_dimensions = v.to_array(),
                (names::GRID_TRANSLATION, UniformValue::Vec3(v)) => block.grid_translation = v.to_array(),
                (names::GRID_TEX, UniformValue::TextureUnit(u)) => block.grid_tex_unit = u,
                (names::GRID_TEX_PREV, UniformValue::TextureUnit(u)) => block.grid_tex_prev_unit = u,
                _ => {}
            }
        }
        block
    }
}
