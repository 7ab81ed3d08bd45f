//! # Input Manager
//!
//! Tracks keyboard state between frames and turns left-button
//! drags into rotation deltas.
//!
//! Drag deltas are the cursor movement in logical pixels, halved, and go
//! straight into the shared [`DragAccumulator`] so that the render thread
//! picks them up on its next frame.

use std::collections::HashMap;
use std::sync::Arc;

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::PhysicalKey,
};

use super::input_state::{ProcessedInputState, RawInputState, COMMAND_KEYS};
use crate::core::DragAccumulator;

/// Divisor applied to logical pixel movement to get rotation degrees.
pub const DRAG_DAMPING: f64 = 2.0;

/// Manages the state of input devices and processes input events.
pub struct InputManager {
    /// Previous state of all tracked keyboard keys
    pub keyboard_inputs_old: HashMap<winit::keyboard::KeyCode, bool>,
    /// Current state of all tracked keyboard keys
    pub keyboard_inputs_new: HashMap<winit::keyboard::KeyCode, bool>,
    /// Whether the left button is down, which makes cursor motion a drag
    pub left_button_down: bool,
    last_cursor_position: Option<PhysicalPosition<f64>>,
    drag: Arc<DragAccumulator>,
}

impl InputManager {
    /// Creates an input manager that writes drag deltas to `drag`.
    pub fn new(drag: Arc<DragAccumulator>) -> Self {
        let keyboard_inputs: HashMap<_, _> =
            COMMAND_KEYS.iter().map(|(key, _)| (*key, false)).collect();

        Self {
            keyboard_inputs_old: keyboard_inputs.clone(),
            keyboard_inputs_new: keyboard_inputs,
            left_button_down: false,
            last_cursor_position: None,
            drag,
        }
    }

    /// Processes a window event and updates internal input state.
    ///
    /// # Arguments
    /// * `event` - The window event to process
    /// * `scale_factor` - Physical pixels per logical pixel of the window
    pub fn intake_input(&mut self, event: &WindowEvent, scale_factor: f64) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state,
                        physical_key: PhysicalKey::Code(key),
                        ..
                    },
                ..
            } => {
                if let Some(key_state) = self.keyboard_inputs_new.get_mut(key) {
                    *key_state = *state == ElementState::Pressed;
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.left_button_down = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.intake_cursor_position(*position, scale_factor);
            }
            WindowEvent::CursorLeft { .. } => {
                self.last_cursor_position = None;
            }
            _ => {}
        }
    }

    /// Records a cursor position, accumulating a drag delta while the left
    /// button is held.
    pub fn intake_cursor_position(&mut self, position: PhysicalPosition<f64>, scale_factor: f64) {
        if let Some(previous) = self.last_cursor_position {
            if self.left_button_down {
                let scale = scale_factor.max(f64::EPSILON) * DRAG_DAMPING;
                let delta_x = (position.x - previous.x) / scale;
                let delta_y = (position.y - previous.y) / scale;
                self.drag.accumulate(delta_x as f32, delta_y as f32);
            }
        }
        self.last_cursor_position = Some(position);
    }

    /// Builds the transitions since the previous frame and advances the
    /// previous state to the current one.
    pub fn get_and_reset_processed_input(&mut self) -> ProcessedInputState {
        let keyboard_states = self
            .keyboard_inputs_new
            .iter()
            .map(|(key, &new_state)| {
                let old_state = self.keyboard_inputs_old.get(key).copied().unwrap_or(false);
                (*key, RawInputState::from_raw_states(old_state, new_state))
            })
            .collect();

        self.move_old_states();

        ProcessedInputState { keyboard_states }
    }

    /// Copies the current state into the previous state.
    pub fn move_old_states(&mut self) {
        self.keyboard_inputs_old.clone_from(&self.keyboard_inputs_new);
    }

    /// Releases everything, for when the window loses focus.
    pub fn reset_inputs(&mut self) {
        self.keyboard_inputs_new.values_mut().for_each(|state| *state = false);
        self.left_button_down = false;
        self.move_old_states();
        self.last_cursor_position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (InputManager, Arc<DragAccumulator>) {
        let drag = Arc::new(DragAccumulator::new());
        (InputManager::new(drag.clone()), drag)
    }

    #[test]
    fn drag_delta_is_halved_logical_movement() {
        let (mut input, drag) = manager();
        input.left_button_down = true;

        input.intake_cursor_position(PhysicalPosition::new(100.0, 100.0), 2.0);
        input.intake_cursor_position(PhysicalPosition::new(140.0, 80.0), 2.0);
        input.intake_cursor_position(PhysicalPosition::new(148.0, 80.0), 2.0);

        assert_eq!(drag.consume(), (12.0, -5.0));
    }

    #[test]
    fn focus_loss_ends_the_drag() {
        let (mut input, drag) = manager();
        input.left_button_down = true;
        input.intake_cursor_position(PhysicalPosition::new(0.0, 0.0), 1.0);

        input.reset_inputs();
        input.intake_cursor_position(PhysicalPosition::new(30.0, 30.0), 1.0);
        input.intake_cursor_position(PhysicalPosition::new(60.0, 60.0), 1.0);

        assert!(!input.left_button_down);
        assert_eq!(drag.consume(), (0.0, 0.0));
    }

    #[test]
    fn cursor_motion_without_button_is_ignored() {
        let (mut input, drag) = manager();
        input.intake_cursor_position(PhysicalPosition::new(0.0, 0.0), 1.0);
        input.intake_cursor_position(PhysicalPosition::new(50.0, 50.0), 1.0);
        assert_eq!(drag.consume(), (0.0, 0.0));
    }

    #[test]
    fn key_press_is_reported_once() {
        let (mut input, _drag) = manager();
        input.keyboard_inputs_new.insert(winit::keyboard::KeyCode::KeyV, true);

        let first = input.get_and_reset_processed_input();
        assert!(first.get_key_state(winit::keyboard::KeyCode::KeyV).is_just_pressed());

        let second = input.get_and_reset_processed_input();
        assert_eq!(
            second.get_key_state(winit::keyboard::KeyCode::KeyV),
            RawInputState::Held
        );
    }
}
