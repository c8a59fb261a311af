//! One node's view of a roomgame: grid, meshes, automaton, rooms and the
//! outer influence, driven frame by frame.
//!
//! Only the master mutates game state. Slaves receive the master's
//! snapshot through [`SharedState`] and just draw it.

use glam::{Mat4, UVec2, Vec3};
use roomgame_core::automaton::CellularAutomaton;
use roomgame_core::constants::*;
use roomgame_core::error::{RoomgameError, SyncError};
use roomgame_core::sync::{SharedState, SyncDecoder, SyncEncoder};
use roomgame_core::types::{BuildState, CellCoord};
use roomgame_grid::InteractiveGrid;
use roomgame_render::uniforms::names;
use roomgame_render::{
    DrawCall, FrameUniforms, GridDebugBuffer, MeshInstanceBuilder, RoomSegmentMeshPool,
    UniformBlock, UniformValue,
};
use roomgame_sim::{AutomatonUpdater, CpuAutomaton, GridStateBuffers};

use crate::config::GameConfig;
use crate::gpu_errors::GpuErrorWatch;
use crate::input::{
    InputAction, InputState, InteractionMode, Key, PointerEvent, PointerPhase, PointerPosition,
};
use crate::outer_influence::OuterInfluence;
use crate::room_manager::RoomInteractionManager;

/// GPU-side mirrors, present once a device is attached.
struct GpuState {
    grid_state: GridStateBuffers,
    debug_points: GridDebugBuffer,
    uniforms: wgpu::Buffer,
    errors: GpuErrorWatch,
}

/// Mesh pool with the room segment meshes and the shader's per-frame
/// uniforms registered.
pub fn standard_mesh_pool(max_instances: u32) -> RoomSegmentMeshPool {
    let mut pool = RoomSegmentMeshPool::new("room_segment", max_instances);
    pool.add_mesh(&[BuildState::INSIDE_ROOM], "floor");
    pool.add_mesh(
        &[
            BuildState::LEFT_LOWER_CORNER,
            BuildState::LEFT_UPPER_CORNER,
            BuildState::RIGHT_LOWER_CORNER,
            BuildState::RIGHT_UPPER_CORNER,
            BuildState::INVALID,
        ],
        "corner",
    );
    pool.add_mesh(
        &[
            BuildState::WALL_BOTTOM,
            BuildState::WALL_TOP,
            BuildState::WALL_RIGHT,
            BuildState::WALL_LEFT,
        ],
        "wall",
    );
    pool.add_mesh(&[BuildState::INSIDE_ROOM_INFECTED], "latticeplane");
    pool.add_mesh(&[BuildState::OUTER_INFLUENCE], "outer_influence");

    pool.update_uniform_every_frame(names::TIME, |f| UniformValue::Float(f.time));
    pool.update_uniform_every_frame(names::AUTOMATON_TIME_DELTA, |f| {
        UniformValue::Float(f.automaton_time_delta)
    });
    pool.update_uniform_every_frame(names::GRID_TEX, |_| {
        UniformValue::TextureUnit(GRID_TEXTURE_UNIT)
    });
    pool.update_uniform_every_frame(names::GRID_TEX_PREV, |_| {
        UniformValue::TextureUnit(GRID_PREV_TEXTURE_UNIT)
    });
    pool.update_uniform_every_frame(names::GRID_DIMENSIONS, |f| {
        UniformValue::UVec2(f.grid_dimensions)
    });
    pool.update_uniform_every_frame(names::GRID_TRANSLATION, |f| {
        UniformValue::Vec3(f.grid_translation)
    });
    pool.update_uniform_every_frame(names::GRID_CELL_SIZE, |f| {
        UniformValue::Float(f.grid_cell_size)
    });
    pool
}

pub struct RoomGame {
    config: GameConfig,
    is_master: bool,
    grid: InteractiveGrid,
    pool: RoomSegmentMeshPool,
    automaton: CpuAutomaton,
    updater: AutomatonUpdater,
    rooms: RoomInteractionManager,
    outer: OuterInfluence,
    input: InputState,
    time: f32,
    slow_accumulator: f32,
    automaton_time_delta: f32,
    transitions: u64,
    gpu: Option<GpuState>,
}

impl RoomGame {
    pub fn new(config: GameConfig, is_master: bool) -> Result<Self, RoomgameError> {
        let grid = InteractiveGrid::new(config.columns, config.rows, config.height_units)?;
        let mut pool = standard_mesh_pool(config.columns * config.rows);
        let mut outer = OuterInfluence::new(
            config.outer_influence_seed,
            config.outer_influence_patrol_height,
            config.outer_influence_attack_height,
        )
        .with_speed(config.outer_influence_speed);
        outer.attach_mesh(&mut pool, &grid);

        log::info!(
            "RoomGame: {} node, {}x{} grid",
            if is_master { "master" } else { "slave" },
            config.columns,
            config.rows
        );

        Ok(Self {
            automaton: CpuAutomaton::new(config.columns, config.rows),
            updater: AutomatonUpdater::new(),
            rooms: RoomInteractionManager::new(config.heal_amount, config.min_room_span),
            input: InputState::new(),
            time: 0.0,
            slow_accumulator: 0.0,
            automaton_time_delta: 0.0,
            transitions: 0,
            gpu: None,
            grid,
            pool,
            outer,
            is_master,
            config,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn grid(&self) -> &InteractiveGrid {
        &self.grid
    }

    pub fn pool(&self) -> &RoomSegmentMeshPool {
        &self.pool
    }

    pub fn automaton(&self) -> &CpuAutomaton {
        &self.automaton
    }

    pub fn updater(&self) -> &AutomatonUpdater {
        &self.updater
    }

    pub fn rooms(&self) -> &RoomInteractionManager {
        &self.rooms
    }

    pub fn outer_influence(&self) -> &OuterInfluence {
        &self.outer
    }

    pub fn mode(&self) -> InteractionMode {
        self.input.mode()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Automaton transitions applied to the grid so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.grid.set_view_projection(view_projection);
    }

    pub fn set_grid_translation(&mut self, translation: Vec3) {
        self.grid.set_translation(translation);
    }

    pub fn set_heal_amount(&mut self, heal_amount: f32) {
        self.rooms.set_heal_amount(heal_amount);
    }

    /// Demolish every room.
    pub fn reset_rooms(&mut self) {
        if !self.is_master {
            return;
        }
        let mut builder =
            MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton);
        self.rooms.reset(&mut builder);
    }

    pub fn handle_key(&mut self, key: Key, pressed: bool) -> Option<InputAction> {
        let action = self.input.handle_key(key, pressed);
        if action == Some(InputAction::InitializeAutomaton)
            && self.is_master
            && !self.automaton.is_initialized()
        {
            self.automaton.initialize();
            for cell in self.grid.cells() {
                self.automaton
                    .update_cell(cell.coord(), cell.build_state(), cell.health());
            }
        }
        action
    }

    fn pointer_cell(&self, position: PointerPosition) -> Option<CellCoord> {
        match position {
            PointerPosition::Ndc(ndc) => self.grid.cell_at_ndc(ndc),
            PointerPosition::Ray {
                origin,
                second_point,
            } => self.grid.pick_cell(origin, second_point),
        }
    }

    /// Route a pointer event according to the interaction mode. Returns
    /// true if the grid was touched.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        if !self.is_master {
            return false;
        }
        let coord = self.pointer_cell(event.position);
        let mut builder =
            MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton);
        match (self.input.mode(), event.phase) {
            (InteractionMode::Camera, _) => false,
            (InteractionMode::Grid, PointerPhase::Down) => coord.is_some_and(|c| {
                self.rooms
                    .start_new_room_interaction_at_touched_cell(&mut builder, event.id, c)
            }),
            (InteractionMode::Grid, PointerPhase::Move) => match coord {
                Some(c) => {
                    self.rooms
                        .adjust_temporary_room_size(&mut builder, event.id, c);
                    true
                }
                None => false,
            },
            (InteractionMode::Grid, PointerPhase::Up) => {
                self.rooms.finalize_temporary_room(&mut builder, event.id)
            }
            (InteractionMode::PlaceOuterInfluence, PointerPhase::Down) => coord.is_some_and(|c| {
                self.updater
                    .populate_circle(&mut builder, c, self.config.populate_radius)
                    > 0
            }),
            (InteractionMode::PlaceOuterInfluence, _) => false,
        }
    }

    /// Advance one frame by `dt` seconds.
    pub fn frame(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, MAX_FRAME_DELTA);
        self.time += dt;

        if self.is_master {
            self.outer.update(dt);
            self.slow_accumulator += dt;
            if self.slow_accumulator >= self.config.slow_update_interval {
                self.slow_accumulator = 0.0;
                let mut builder =
                    MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton);
                self.outer.update_slow(&mut builder);
            }
            self.step_automaton();
            self.outer.write_instance(&mut self.pool, &self.grid);
            self.automaton_time_delta = self
                .automaton
                .time_delta_normalized(self.time, &self.config.automaton);
        }
        self.update_uniforms();
    }

    /// Run a due automaton transition and pull its results into the grid.
    /// Returns how many cells the transition changed.
    fn step_automaton(&mut self) -> usize {
        let Some(changes) = self.automaton.transition(self.time, &self.config.automaton) else {
            return 0;
        };
        let mut builder =
            MeshInstanceBuilder::new(&mut self.grid, &mut self.pool, &mut self.automaton);
        self.updater.on_transition(&mut builder);
        self.updater.apply_transitions(&mut builder, &changes);
        self.transitions += 1;
        changes.len()
    }

    fn update_uniforms(&mut self) {
        let frame = FrameUniforms {
            time: self.time,
            automaton_time_delta: self.automaton_time_delta,
            grid_dimensions: UVec2::new(self.grid.columns(), self.grid.rows()),
            grid_translation: self.grid.translation(),
            grid_cell_size: self.grid.cell_size(),
        };
        self.pool.update_uniforms(&frame);
    }

    pub fn uniform_block(&self) -> UniformBlock {
        self.pool.uniform_block()
    }

    /// Draw calls for this frame. The shadow pass leaves out the outer
    /// influence.
    pub fn draw_list(&self, shadow_pass: bool) -> Vec<DrawCall> {
        let debug = self.input.debug_render();
        if shadow_pass {
            self.pool.draw_list(BuildState::OUTER_INFLUENCE, true, debug)
        } else {
            self.pool.draw_list(BuildState::EMPTY, false, debug)
        }
    }

    pub fn attach_gpu(&mut self, device: &wgpu::Device) {
        let cells = self.grid.cell_count() as u32;
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("room-segment-uniforms"),
            size: std::mem::size_of::<UniformBlock>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.gpu = Some(GpuState {
            grid_state: GridStateBuffers::new(device, cells),
            debug_points: GridDebugBuffer::new(device, cells),
            uniforms,
            errors: GpuErrorWatch::install(device),
        });
    }

    /// Push this frame's instance, grid state, debug point and uniform
    /// data to the GPU.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.pool.upload(device, queue);
        if let Some(gpu) = &self.gpu {
            gpu.grid_state.upload(queue, &self.automaton);
            gpu.debug_points.upload(queue, &mut self.grid);
            queue.write_buffer(
                &gpu.uniforms,
                0,
                bytemuck::bytes_of(&self.pool.uniform_block()),
            );
        }
    }

    /// End-of-frame GPU error check.
    pub fn post_draw(&mut self) -> Option<u32> {
        self.gpu.as_mut().and_then(|gpu| gpu.errors.post_draw())
    }
}

impl SharedState for RoomGame {
    fn pre_sync(&mut self) {
        self.outer.write_instance(&mut self.pool, &self.grid);
    }

    fn encode(&self, encoder: &mut SyncEncoder) {
        encoder.write_f32(self.time);
        encoder.write_f32(self.automaton_time_delta);
        self.grid.encode(encoder);
        self.pool.encode(encoder);
        self.outer.encode(encoder);
    }

    fn decode(&mut self, decoder: &mut SyncDecoder<'_>) -> Result<(), SyncError> {
        let time = decoder.read_f32()?;
        let automaton_time_delta = decoder.read_f32()?;
        self.grid.decode(decoder)?;
        self.pool.decode(decoder)?;
        self.outer.decode(decoder)?;
        self.time = time;
        self.automaton_time_delta = automaton_time_delta;
        Ok(())
    }

    fn update_synced_slave(&mut self) {
        self.update_uniforms();
    }
}
