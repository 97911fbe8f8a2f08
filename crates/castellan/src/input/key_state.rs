//! Keyboard snapshots

use std::fmt;

use crate::input::ScanCode;
use crate::sys::input::{self as native, NUM_SCANCODES};

/// The keyboard as of the last [`update`](KeyState::update), plus the frame
/// before it.
///
/// Call `update` once per frame after pumping events; the `was_just_*`
/// queries compare the two snapshots.
#[derive(Clone)]
pub struct KeyState {
    current: Box<[u8; NUM_SCANCODES]>,
    previous: Box<[u8; NUM_SCANCODES]>,
    key_count: usize,
}

impl KeyState {
    /// Takes a snapshot. Both frames start out equal.
    pub fn new() -> Self {
        let mut current = Box::new([0; NUM_SCANCODES]);
        let key_count = native::keyboard_state(current.as_mut_slice());
        let previous = current.clone();
        Self { current, previous, key_count }
    }

    /// Moves the current snapshot to the previous frame and reads a new one.
    pub fn update(&mut self) {
        self.previous.copy_from_slice(self.current.as_slice());
        self.key_count = native::keyboard_state(self.current.as_mut_slice());
    }

    /// Whether `key` is down in the current frame.
    pub fn is_pressed(&self, key: ScanCode) -> bool {
        Self::down(&self.current, key)
    }

    /// Whether `key` is down in both frames.
    pub fn is_held(&self, key: ScanCode) -> bool {
        Self::down(&self.current, key) && Self::down(&self.previous, key)
    }

    /// Whether `key` went down since the previous frame.
    pub fn was_just_pressed(&self, key: ScanCode) -> bool {
        Self::down(&self.current, key) && !Self::down(&self.previous, key)
    }

    /// Whether `key` went up since the previous frame.
    pub fn was_just_released(&self, key: ScanCode) -> bool {
        !Self::down(&self.current, key) && Self::down(&self.previous, key)
    }

    /// Number of entries in the native keyboard array.
    pub const fn key_count(&self) -> usize {
        self.key_count
    }

    fn down(states: &[u8; NUM_SCANCODES], key: ScanCode) -> bool {
        states.get(key.index()).is_some_and(|state| *state != 0)
    }
}

impl Default for KeyState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pressed: Vec<_> = (0..NUM_SCANCODES)
            .filter(|code| self.current[*code] != 0)
            .filter_map(|code| u16::try_from(code).ok().map(ScanCode::new))
            .collect();
        f.debug_struct("KeyState")
            .field("pressed", &pressed)
            .field("key_count", &self.key_count)
            .finish()
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key_state{{keys: {}}}", self.key_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DEVICE_LOCK;

    fn press(key: ScanCode, pressed: bool) {
        assert_eq!(native::push_key_event(key.index(), pressed), 0);
    }

    #[test]
    fn test_transitions() {
        let _guard = DEVICE_LOCK.lock();
        let mut keys = KeyState::new();
        assert_eq!(keys.key_count(), NUM_SCANCODES);
        assert!(!keys.is_pressed(ScanCode::W));

        press(ScanCode::W, true);
        keys.update();
        assert!(keys.is_pressed(ScanCode::W));
        assert!(keys.was_just_pressed(ScanCode::W));
        assert!(!keys.is_held(ScanCode::W));

        keys.update();
        assert!(keys.is_held(ScanCode::W));
        assert!(!keys.was_just_pressed(ScanCode::W));

        press(ScanCode::W, false);
        keys.update();
        assert!(!keys.is_pressed(ScanCode::W));
        assert!(keys.was_just_released(ScanCode::W));

        keys.update();
        assert!(!keys.was_just_released(ScanCode::W));
    }

    #[test]
    fn test_snapshot_is_stable_until_update() {
        let _guard = DEVICE_LOCK.lock();
        let keys = KeyState::new();
        press(ScanCode::SPACE, true);
        assert!(!keys.is_pressed(ScanCode::SPACE));
        assert!(KeyState::new().is_pressed(ScanCode::SPACE));
        press(ScanCode::SPACE, false);
    }

    #[test]
    fn test_unknown_key_is_never_pressed() {
        let keys = KeyState::default();
        assert!(!keys.is_pressed(ScanCode::UNKNOWN));
        assert!(!keys.was_just_released(ScanCode::UNKNOWN));
    }
}
