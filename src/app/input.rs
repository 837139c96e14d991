use winit::event::{MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    Quit,
    Remount,
    Screenshot,
}

pub fn map_key(key: PhysicalKey) -> InputAction {
    match key {
        PhysicalKey::Code(KeyCode::Escape) => InputAction::Quit,
        PhysicalKey::Code(KeyCode::KeyR) => InputAction::Remount,
        PhysicalKey::Code(KeyCode::F12) => InputAction::Screenshot,
        _ => InputAction::None,
    }
}

/// Pixel deltas to line notches for touchpads that report pixels.
const PIXELS_PER_NOTCH: f32 = 120.0;

pub fn scroll_notches(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_NOTCH,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerMotion {
    None,
    Orbit { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
}

/// Cursor position and held buttons, turned into camera motions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerState {
    cursor: Option<(f32, f32)>,
    left: bool,
    right: bool,
}

impl PointerState {
    /// Returns true when the orbit drag starts or stops.
    pub fn button(&mut self, button: MouseButton, pressed: bool) -> bool {
        match button {
            MouseButton::Left => {
                let changed = self.left != pressed;
                self.left = pressed;
                changed
            }
            MouseButton::Right => {
                self.right = pressed;
                false
            }
            _ => false,
        }
    }

    pub fn is_orbiting(&self) -> bool {
        self.left
    }

    pub fn moved(&mut self, x: f32, y: f32) -> PointerMotion {
        let previous = self.cursor.replace((x, y));
        let Some((px, py)) = previous else {
            return PointerMotion::None;
        };
        let (dx, dy) = (x - px, y - py);
        if self.left {
            PointerMotion::Orbit { dx, dy }
        } else if self.right {
            PointerMotion::Pan { dx, dy }
        } else {
            PointerMotion::None
        }
    }

    /// Cursor left the window or focus was lost; drop held buttons.
    pub fn release_all(&mut self) {
        self.cursor = None;
        self.left = false;
        self.right = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{map_key, scroll_notches, InputAction, PointerMotion, PointerState};
    use winit::dpi::PhysicalPosition;
    use winit::event::{MouseButton, MouseScrollDelta};
    use winit::keyboard::{KeyCode, PhysicalKey};

    #[test]
    fn host_keys_map_to_actions() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::Escape)), InputAction::Quit);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyR)), InputAction::Remount);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::F12)), InputAction::Screenshot);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyW)), InputAction::None);
    }

    #[test]
    fn left_drag_orbits_and_right_drag_pans() {
        let mut pointer = PointerState::default();
        assert_eq!(pointer.moved(10.0, 10.0), PointerMotion::None);
        assert!(pointer.button(MouseButton::Left, true));
        assert_eq!(pointer.moved(14.0, 7.0), PointerMotion::Orbit { dx: 4.0, dy: -3.0 });
        assert!(pointer.button(MouseButton::Left, false));
        pointer.button(MouseButton::Right, true);
        assert_eq!(pointer.moved(15.0, 7.0), PointerMotion::Pan { dx: 1.0, dy: 0.0 });
    }

    #[test]
    fn releasing_forgets_cursor() {
        let mut pointer = PointerState::default();
        pointer.button(MouseButton::Left, true);
        pointer.moved(1.0, 1.0);
        pointer.release_all();
        assert!(!pointer.is_orbiting());
        assert_eq!(pointer.moved(50.0, 50.0), PointerMotion::None);
    }

    #[test]
    fn pixel_scroll_is_normalized() {
        assert_eq!(scroll_notches(MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        let delta = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -240.0));
        assert_eq!(scroll_notches(delta), -2.0);
    }
}
