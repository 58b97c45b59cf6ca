//! Keyboard and mouse bindings
//!
//! | Input                | Effect                               |
//! |----------------------|--------------------------------------|
//! | `0`..`9`             | set the shader `mode`                |
//! | Tab                  | toggle orbit / free-fly camera       |
//! | W A S D              | walk (free-fly)                      |
//! | arrows, left drag    | spin and tilt                        |
//! | right drag           | pan (orbit)                          |
//! | scroll               | zoom (orbit)                         |
//! | Escape               | quit                                 |

use deferred_engine::frame::{FrameState, Movement};
use glfw::{Action, Key, MouseButton, WindowEvent};

/// Degrees per arrow-key press
const ARROW_STEP: f32 = 5.0;
/// Degrees of spin or tilt per pixel of left drag
const DRAG_DEGREES_PER_PIXEL: f32 = 1.0 / 3.0;
/// World units of pan per pixel of right drag
const PAN_PER_PIXEL: f32 = 0.05;

/// What the main loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResponse {
    Continue,
    Quit,
}

/// Mouse drag tracking between events
#[derive(Debug, Default)]
pub struct InputHandler {
    dragging: Option<MouseButton>,
    cursor: Option<(f64, f64)>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one window event to the frame state
    pub fn handle(&mut self, event: &WindowEvent, frame: &mut FrameState) -> InputResponse {
        match *event {
            WindowEvent::Key(Key::Escape, _, Action::Press, _) | WindowEvent::Close => return InputResponse::Quit,
            WindowEvent::Key(Key::Tab, _, Action::Press, _) => frame.toggle_camera_mode(),
            WindowEvent::Key(key, _, action, _) => key_binding(key, action, frame),
            WindowEvent::MouseButton(button, Action::Press, _) => self.dragging = Some(button),
            WindowEvent::MouseButton(button, Action::Release, _) if self.dragging == Some(button) => {
                self.dragging = None;
            }
            WindowEvent::CursorPos(x, y) => self.drag(x, y, frame),
            WindowEvent::Scroll(_, y) => frame.zoom_camera(y as f32),
            _ => {}
        }
        InputResponse::Continue
    }

    fn drag(&mut self, x: f64, y: f64, frame: &mut FrameState) {
        let previous = self.cursor.replace((x, y));
        let Some((px, py)) = previous else {
            return;
        };
        let (dx, dy) = ((x - px) as f32, (y - py) as f32);

        match self.dragging {
            Some(MouseButton::Button1) => {
                frame.rotate_camera(dx * DRAG_DEGREES_PER_PIXEL, dy * DRAG_DEGREES_PER_PIXEL);
            }
            Some(MouseButton::Button2) => frame.pan_camera(dx * PAN_PER_PIXEL, -dy * PAN_PER_PIXEL),
            _ => {}
        }
    }
}

fn key_binding(key: Key, action: Action, frame: &mut FrameState) {
    if let Some(movement) = movement_key(key) {
        match action {
            Action::Press => frame.set_movement(movement, true),
            Action::Release => frame.set_movement(movement, false),
            Action::Repeat => {}
        }
        return;
    }

    if action == Action::Release {
        return;
    }
    match key {
        Key::Left => frame.rotate_camera(-ARROW_STEP, 0.0),
        Key::Right => frame.rotate_camera(ARROW_STEP, 0.0),
        Key::Up => frame.rotate_camera(0.0, ARROW_STEP),
        Key::Down => frame.rotate_camera(0.0, -ARROW_STEP),
        _ => {
            if let Some(mode) = digit(key) {
                if action == Action::Press {
                    frame.set_mode(mode);
                }
            }
        }
    }
}

fn movement_key(key: Key) -> Option<Movement> {
    match key {
        Key::W => Some(Movement::Forward),
        Key::S => Some(Movement::Backward),
        Key::A => Some(Movement::Left),
        Key::D => Some(Movement::Right),
        _ => None,
    }
}

fn digit(key: Key) -> Option<i32> {
    let digits = [
        Key::Num0,
        Key::Num1,
        Key::Num2,
        Key::Num3,
        Key::Num4,
        Key::Num5,
        Key::Num6,
        Key::Num7,
        Key::Num8,
        Key::Num9,
    ];
    digits.iter().position(|&k| k == key).map(|n| n as i32)
}
