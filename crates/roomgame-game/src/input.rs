use glam::{Vec2, Vec3};

/// What pointer input currently drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// The host's camera controls own the pointer.
    Camera,
    /// Pointer gestures create rooms and repair cells.
    #[default]
    Grid,
    /// Clicks seed simulated fluid for the outer influence.
    PlaceOuterInfluence,
}

/// Keys the game reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Hold for camera mode.
    C,
    /// Toggle between grid and placement mode.
    S,
    /// Hold for the debug render.
    D,
    /// Tilt the camera.
    V,
}

/// Side effects of a key the session or host has to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Placement mode was entered or left; the automaton must be running.
    InitializeAutomaton,
    /// Forwarded to the host camera.
    TiltCamera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// Where a pointer is, either already in NDC or as a pick ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerPosition {
    Ndc(Vec2),
    Ray { origin: Vec3, second_point: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub id: u32,
    pub phase: PointerPhase,
    pub position: PointerPosition,
}

/// Keyboard-driven mode state.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    mode: InteractionMode,
    /// Mode to return to when the camera key is released.
    mode_before_camera: InteractionMode,
    debug_render: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn debug_render(&self) -> bool {
        self.debug_render
    }

    pub fn handle_key(&mut self, key: Key, pressed: bool) -> Option<InputAction> {
        match (key, pressed) {
            (Key::C, true) => {
                if self.mode != InteractionMode::Camera {
                    self.mode_before_camera = self.mode;
                    self.mode = InteractionMode::Camera;
                }
                None
            }
            (Key::C, false) => {
                if self.mode == InteractionMode::Camera {
                    self.mode = self.mode_before_camera;
                }
                None
            }
            (Key::S, true) => {
                self.mode = match self.mode {
                    InteractionMode::PlaceOuterInfluence => InteractionMode::Grid,
                    InteractionMode::Grid => InteractionMode::PlaceOuterInfluence,
                    InteractionMode::Camera => return None,
                };
                log::info!("Interaction mode: {:?}", self.mode);
                Some(InputAction::InitializeAutomaton)
            }
            (Key::D, held) => {
                self.debug_render = held;
                None
            }
            (Key::V, true) => Some(InputAction::TiltCamera),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_key_is_held() {
        let mut input = InputState::new();
        input.handle_key(Key::S, true);
        assert_eq!(input.mode(), InteractionMode::PlaceOuterInfluence);
        input.handle_key(Key::C, true);
        assert_eq!(input.mode(), InteractionMode::Camera);
        // Key repeat must not overwrite the saved mode.
        input.handle_key(Key::C, true);
        input.handle_key(Key::C, false);
        assert_eq!(input.mode(), InteractionMode::PlaceOuterInfluence);
    }

    #[test]
    fn test_s_toggles_and_requests_automaton() {
        let mut input = InputState::new();
        assert_eq!(input.mode(), InteractionMode::Grid);
        assert_eq!(input.handle_key(Key::S, true), Some(InputAction::InitializeAutomaton));
        assert_eq!(input.mode(), InteractionMode::PlaceOuterInfluence);
        assert_eq!(input.handle_key(Key::S, false), None);
        input.handle_key(Key::S, true);
        assert_eq!(input.mode(), InteractionMode::Grid);
    }

    #[test]
    fn test_s_ignored_in_camera_mode() {
        let mut input = InputState::new();
        input.handle_key(Key::C, true);
        assert_eq!(input.handle_key(Key::S, true), None);
        assert_eq!(input.mode(), InteractionMode::Camera);
    }

    #[test]
    fn test_debug_render_follows_key() {
        let mut input = InputState::new();
        input.handle_key(Key::D, true);
        assert!(input.debug_render());
        input.handle_key(Key::D, false);
        assert!(!input.debug_render());
        assert_eq!(input.handle_key(Key::V, true), Some(InputAction::TiltCamera));
    }
}
