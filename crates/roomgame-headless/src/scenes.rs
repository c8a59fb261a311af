use roomgame_game::Key;

/// One scripted input or pause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Key { key: Key, pressed: bool },
    /// Press at `from`, move to `to`, release.
    Drag { from: (u32, u32), to: (u32, u32) },
    /// Press and release on one cell.
    Tap { cell: (u32, u32) },
    /// Advance this many frames.
    Frames(u32),
}

/// A scripted session.
pub struct SceneConfig {
    pub name: &'static str,
    pub steps: Vec<Step>,
}

fn press(key: Key) -> [Step; 2] {
    [
        Step::Key { key, pressed: true },
        Step::Key {
            key,
            pressed: false,
        },
    ]
}

/// Return the standard scenes: a lone room, a small building, and a
/// building under attack by the automaton and outer influence.
pub fn standard_scenes() -> Vec<SceneConfig> {
    let building = vec![
        Step::Drag {
            from: (20, 20),
            to: (27, 27),
        },
        Step::Drag {
            from: (28, 20),
            to: (33, 27),
        },
        Step::Drag {
            from: (20, 28),
            to: (27, 33),
        },
        // Detached, must be rejected.
        Step::Drag {
            from: (45, 45),
            to: (50, 50),
        },
    ];

    let mut infection = building.clone();
    infection.extend(press(Key::S));
    infection.push(Step::Tap { cell: (14, 24) });
    infection.push(Step::Tap { cell: (14, 30) });
    infection.push(Step::Frames(50));
    infection.push(Step::Tap { cell: (14, 24) });

    vec![
        SceneConfig {
            name: "first_room",
            steps: vec![Step::Drag {
                from: (5, 5),
                to: (8, 8),
            }],
        },
        SceneConfig {
            name: "building",
            steps: building,
        },
        SceneConfig {
            name: "infection",
            steps: infection,
        },
    ]
}
