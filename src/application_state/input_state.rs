//! # Input State
//!
//! Key state transitions, and the mapping from keys to
//! [`UserCommand`]s.

use std::collections::HashMap;
use winit::keyboard::KeyCode;

use crate::engine_state::UserCommand;

/// Keys that issue a command when first pressed.
pub const COMMAND_KEYS: [(KeyCode, UserCommand); 8] = [
    (KeyCode::ArrowUp, UserCommand::IncreaseCubeCount),
    (KeyCode::Equal, UserCommand::IncreaseCubeCount),
    (KeyCode::NumpadAdd, UserCommand::IncreaseCubeCount),
    (KeyCode::ArrowDown, UserCommand::DecreaseCubeCount),
    (KeyCode::Minus, UserCommand::DecreaseCubeCount),
    (KeyCode::NumpadSubtract, UserCommand::DecreaseCubeCount),
    (KeyCode::KeyV, UserCommand::ToggleStorage),
    (KeyCode::KeyS, UserCommand::ToggleStride),
];

/// Represents the state of a key or button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawInputState {
    /// Key/button is not pressed
    #[default]
    NotPressed,
    /// Key/button was just pressed this frame
    Pressed,
    /// Key/button has been held down for multiple frames
    Held,
    /// Key/button was just released this frame
    Released,
}

impl RawInputState {
    /// Determines if the input was just pressed this frame
    pub fn is_just_pressed(&self) -> bool {
        matches!(self, RawInputState::Pressed)
    }

    /// Derives the transition from the previous and current raw states
    pub fn from_raw_states(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => RawInputState::Pressed,
            (true, true) => RawInputState::Held,
            (true, false) => RawInputState::Released,
            (false, false) => RawInputState::NotPressed,
        }
    }
}

/// A snapshot of key transitions for one frame.
#[derive(Debug, Default)]
pub struct ProcessedInputState {
    /// State of all tracked keyboard keys
    pub keyboard_states: HashMap<KeyCode, RawInputState>,
}

impl ProcessedInputState {
    /// Gets the state of a keyboard key
    pub fn get_key_state(&self, key: KeyCode) -> RawInputState {
        self.keyboard_states.get(&key).copied().unwrap_or_default()
    }

    /// Commands for keys pressed this frame, in `COMMAND_KEYS` order.
    pub fn commands(&self) -> Vec<UserCommand> {
        COMMAND_KEYS
            .iter()
            .filter(|(key, _)| self.get_key_state(*key).is_just_pressed())
            .map(|(_, command)| *command)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_keys(keys: &[(KeyCode, RawInputState)]) -> ProcessedInputState {
        ProcessedInputState {
            keyboard_states: keys.iter().copied().collect(),
        }
    }

    #[test]
    fn transitions_from_raw_states() {
        assert_eq!(RawInputState::from_raw_states(false, true), RawInputState::Pressed);
        assert_eq!(RawInputState::from_raw_states(true, true), RawInputState::Held);
        assert_eq!(RawInputState::from_raw_states(true, false), RawInputState::Released);
        assert_eq!(RawInputState::from_raw_states(false, false), RawInputState::NotPressed);
    }

    #[test]
    fn only_fresh_presses_issue_commands() {
        let input = with_keys(&[
            (KeyCode::ArrowUp, RawInputState::Pressed),
            (KeyCode::KeyV, RawInputState::Held),
            (KeyCode::KeyS, RawInputState::Pressed),
            (KeyCode::Minus, RawInputState::Released),
        ]);
        assert_eq!(
            input.commands(),
            vec![UserCommand::IncreaseCubeCount, UserCommand::ToggleStride]
        );
    }

    #[test]
    fn untracked_keys_are_not_pressed() {
        let input = ProcessedInputState::default();
        assert_eq!(input.get_key_state(KeyCode::KeyQ), RawInputState::NotPressed);
        assert!(input.commands().is_empty());
    }
}
