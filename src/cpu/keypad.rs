//! Hex keypad state and the input source interface.
//!
//! The COSMAC VIP keypad layout:
//!
//! ```text
//! 1 2 3 C
//! 4 5 6 D
//! 7 8 9 E
//! A 0 B F
//! ```

use serde::{Serialize, Deserialize};
use std::collections::VecDeque;

/// Number of keys on the keypad.
pub const KEY_COUNT: usize = 16;

/// Most presses an input source keeps waiting for FX0A. Older ones are dropped.
pub const PRESS_QUEUE_LIMIT: usize = KEY_COUNT;

/// Queue a press, dropping the oldest once [`PRESS_QUEUE_LIMIT`] is reached.
pub fn queue_press(presses: &mut VecDeque<u8>, key: u8) {
    if presses.len() >= PRESS_QUEUE_LIMIT {
        presses.pop_front();
    }
    presses.push_back(key & 0x0F);
}

/// Source of key events, supplied by the host.
pub trait Keypad {
    /// Whether `key` (0-F) is currently held.
    fn is_key_down(&self, key: u8) -> bool;

    /// Non-blocking: a key that went down since the last call, if any.
    fn poll_next_key_down(&mut self) -> Option<u8>;
}

/// Keypad with nothing ever pressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeys;

impl Keypad for NoKeys {
    fn is_key_down(&self, _key: u8) -> bool {
        false
    }

    fn poll_next_key_down(&mut self) -> Option<u8> {
        None
    }
}

/// Keypad driven from code: a set of held keys plus a queue of presses.
#[derive(Debug, Default, Clone)]
pub struct ScriptedKeypad {
    held: Keys,
    presses: VecDeque<u8>,
}

impl ScriptedKeypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue presses to be reported by `poll_next_key_down`.
    pub fn with_presses(keys: &[u8]) -> Self {
        let mut pad = Self::new();
        for &key in keys {
            pad.press(key);
        }
        pad
    }

    /// Hold or release a key.
    pub fn hold(&mut self, key: u8, down: bool) {
        self.held.set(key, down);
    }

    /// Queue a single press.
    pub fn press(&mut self, key: u8) {
        queue_press(&mut self.presses, key);
    }

    /// Number of presses not yet polled.
    pub fn pending(&self) -> usize {
        self.presses.len()
    }
}

impl Keypad for ScriptedKeypad {
    fn is_key_down(&self, key: u8) -> bool {
        self.held.is_down(key)
    }

    fn poll_next_key_down(&mut self) -> Option<u8> {
        self.presses.pop_front()
    }
}

/// The machine's view of which keys are held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    down: [bool; KEY_COUNT],
}

impl Keys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the low nibble of `key` is used.
    #[inline]
    pub fn is_down(&self, key: u8) -> bool {
        self.down[(key & 0x0F) as usize]
    }

    pub fn set(&mut self, key: u8, down: bool) {
        self.down[(key & 0x0F) as usize] = down;
    }

    /// Copy the held state of every key from an input source.
    pub fn sync(&mut self, keypad: &impl Keypad) {
        for key in 0..KEY_COUNT as u8 {
            self.down[key as usize] = keypad.is_key_down(key);
        }
    }

    pub fn release_all(&mut self) {
        self.down = [false; KEY_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_masked() {
        let mut keys = Keys::new();
        keys.set(0x1B, true);
        assert!(keys.is_down(0xB));
    }

    #[test]
    fn test_sync_from_keypad() {
        let mut pad = ScriptedKeypad::new();
        pad.hold(0x4, true);
        let mut keys = Keys::new();
        keys.set(0x2, true);
        keys.sync(&pad);
        assert!(keys.is_down(0x4));
        assert!(!keys.is_down(0x2));
    }

    #[test]
    fn test_scripted_presses_in_order() {
        let mut pad = ScriptedKeypad::with_presses(&[0x3, 0xF]);
        assert_eq!(pad.poll_next_key_down(), Some(0x3));
        assert_eq!(pad.poll_next_key_down(), Some(0xF));
        assert_eq!(pad.poll_next_key_down(), None);
    }

    #[test]
    fn test_press_queue_keeps_newest() {
        let mut pad = ScriptedKeypad::new();
        for i in 0..1000u32 {
            pad.press((i % 16) as u8);
        }
        assert_eq!(pad.pending(), PRESS_QUEUE_LIMIT);
        assert_eq!(pad.poll_next_key_down(), Some(((1000 - PRESS_QUEUE_LIMIT) % 16) as u8));
    }
}
