//! QWERTY keyboard as a CHIP-8 keypad.
//!
//! ```text
//! 1 2 3 4        1 2 3 C
//! Q W E R   ->   4 5 6 D
//! A S D F        7 8 9 E
//! Z X C V        A 0 B F
//! ```
//!
//! Most terminals only report presses and auto-repeats. A key therefore
//! counts as held until no press or repeat has been seen for
//! [`HOLD_TIMEOUT`], or until a release event arrives on terminals that
//! send them.

use crate::cpu::keypad::{queue_press, Keypad, KEY_COUNT};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a key stays down after its last press or repeat.
pub const HOLD_TIMEOUT: Duration = Duration::from_millis(250);

/// Map a keyboard character to a keypad key.
pub fn map_key(c: char) -> Option<u8> {
    let key = match c.to_ascii_lowercase() {
        '1' => 0x1,
        '2' => 0x2,
        '3' => 0x3,
        '4' => 0xC,
        'q' => 0x4,
        'w' => 0x5,
        'e' => 0x6,
        'r' => 0xD,
        'a' => 0x7,
        's' => 0x8,
        'd' => 0x9,
        'f' => 0xE,
        'z' => 0xA,
        'x' => 0x0,
        'c' => 0xB,
        'v' => 0xF,
        _ => return None,
    };
    Some(key)
}

/// Keypad fed by crossterm key events.
#[derive(Debug, Clone, Default)]
pub struct TerminalKeypad {
    last_seen: [Option<Instant>; KEY_COUNT],
    presses: VecDeque<u8>,
}

impl TerminalKeypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key event. Returns `false` if the key is not on the keypad.
    pub fn handle(&mut self, event: &KeyEvent, now: Instant) -> bool {
        let key = match event.code {
            KeyCode::Char(c) => match map_key(c) {
                Some(key) => key,
                None => return false,
            },
            _ => return false,
        };

        let slot = &mut self.last_seen[key as usize];
        match event.kind {
            KeyEventKind::Press => {
                // Auto-repeat without release events looks like fresh presses
                if slot.is_none() {
                    queue_press(&mut self.presses, key);
                }
                *slot = Some(now);
            }
            KeyEventKind::Repeat => *slot = Some(now),
            KeyEventKind::Release => *slot = None,
        }
        true
    }

    /// Release keys not seen within the hold timeout.
    pub fn refresh(&mut self, now: Instant) {
        for slot in self.last_seen.iter_mut() {
            if matches!(slot, Some(seen) if now.duration_since(*seen) > HOLD_TIMEOUT) {
                *slot = None;
            }
        }
    }

    /// Forget all held keys and queued presses.
    pub fn clear(&mut self) {
        self.last_seen = [None; KEY_COUNT];
        self.presses.clear();
    }
}

impl Keypad for TerminalKeypad {
    fn is_key_down(&self, key: u8) -> bool {
        self.last_seen[(key & 0x0F) as usize].is_some()
    }

    fn poll_next_key_down(&mut self) -> Option<u8> {
        self.presses.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::keypad::PRESS_QUEUE_LIMIT;
    use crossterm::event::KeyModifiers;

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_layout() {
        assert_eq!(map_key('4'), Some(0xC));
        assert_eq!(map_key('Q'), Some(0x4));
        assert_eq!(map_key('x'), Some(0x0));
        assert_eq!(map_key('v'), Some(0xF));
        assert_eq!(map_key('p'), None);
    }

    #[test]
    fn test_press_is_held_until_timeout() {
        let mut pad = TerminalKeypad::new();
        let t0 = Instant::now();
        assert!(pad.handle(&press('w'), t0));
        assert!(pad.is_key_down(0x5));

        pad.refresh(t0 + HOLD_TIMEOUT / 2);
        assert!(pad.is_key_down(0x5));

        pad.refresh(t0 + HOLD_TIMEOUT * 2);
        assert!(!pad.is_key_down(0x5));
    }

    #[test]
    fn test_repeats_queue_one_press() {
        let mut pad = TerminalKeypad::new();
        let t0 = Instant::now();
        pad.handle(&press('a'), t0);
        pad.handle(&press('a'), t0 + Duration::from_millis(30));
        assert_eq!(pad.poll_next_key_down(), Some(0x7));
        assert_eq!(pad.poll_next_key_down(), None);
    }

    #[test]
    fn test_press_queue_is_bounded() {
        let mut pad = TerminalKeypad::new();
        let t0 = Instant::now();
        let release = KeyEvent::new_with_kind(KeyCode::Char('q'), KeyModifiers::NONE, KeyEventKind::Release);
        for _ in 0..1000 {
            pad.handle(&press('q'), t0);
            pad.handle(&release, t0);
        }
        let queued = std::iter::from_fn(|| pad.poll_next_key_down()).count();
        assert_eq!(queued, PRESS_QUEUE_LIMIT);
    }

    #[test]
    fn test_release_event() {
        let mut pad = TerminalKeypad::new();
        let t0 = Instant::now();
        pad.handle(&press('f'), t0);
        let release = KeyEvent::new_with_kind(KeyCode::Char('f'), KeyModifiers::NONE, KeyEventKind::Release);
        pad.handle(&release, t0);
        assert!(!pad.is_key_down(0xE));
    }

    #[test]
    fn test_unmapped_keys_ignored() {
        let mut pad = TerminalKeypad::new();
        assert!(!pad.handle(&press('n'), Instant::now()));
        assert!(!pad.handle(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), Instant::now()));
        assert_eq!(pad.poll_next_key_down(), None);
    }
}
