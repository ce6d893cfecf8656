use std::collections::HashSet;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard state for the current frame.
///
/// A release is recorded once per physical key-up event and is visible until
/// [`InputState::end_frame`], so every consumer observes it exactly once per
/// frame regardless of how many times it asks.
#[derive(Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed_this_frame: HashSet<KeyCode>,
    released_this_frame: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        if event.repeat {
            return;
        }
        if let PhysicalKey::Code(code) = event.physical_key {
            match event.state {
                ElementState::Pressed => self.press(code),
                ElementState::Released => self.release(code),
            }
        }
    }

    pub fn press(&mut self, code: KeyCode) {
        if self.held.insert(code) {
            self.pressed_this_frame.insert(code);
        }
    }

    pub fn release(&mut self, code: KeyCode) {
        self.held.remove(&code);
        self.released_this_frame.insert(code);
    }

    pub fn key_held(&self, code: KeyCode) -> bool {
        self.held.contains(&code)
    }

    pub fn key_pressed(&self, code: KeyCode) -> bool {
        self.pressed_this_frame.contains(&code)
    }

    pub fn key_released(&self, code: KeyCode) -> bool {
        self.released_this_frame.contains(&code)
    }

    pub fn end_frame(&mut self) {
        self.pressed_this_frame.clear();
        self.released_this_frame.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_visible_until_frame_end() {
        let mut input = InputState::new();
        input.press(KeyCode::Digit1);
        assert!(input.key_pressed(KeyCode::Digit1));
        assert!(!input.key_released(KeyCode::Digit1));

        input.release(KeyCode::Digit1);
        assert!(input.key_released(KeyCode::Digit1));
        assert!(input.key_released(KeyCode::Digit1));
        assert!(!input.key_held(KeyCode::Digit1));

        input.end_frame();
        assert!(!input.key_released(KeyCode::Digit1));
        assert!(!input.key_pressed(KeyCode::Digit1));
    }

    #[test]
    fn holding_does_not_repeat_press() {
        let mut input = InputState::new();
        input.press(KeyCode::Space);
        input.end_frame();
        input.press(KeyCode::Space);
        assert!(!input.key_pressed(KeyCode::Space));
        assert!(input.key_held(KeyCode::Space));
    }
}
