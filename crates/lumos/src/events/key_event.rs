//! Packed key events
//!
//! A [`KeyEvent`] stores the action in bit 0 and the key value in bits 1-15
//! of a single `u16`:
//!
//! ```text
//!  15                              1   0
//! ┌──────────────────────────────────┬───┐
//! │            key value             │ A │
//! └──────────────────────────────────┴───┘
//! ```
//!
//! Both setters OR their field into the existing bits rather than replacing
//! it. An event is meant to be assembled once: construct with an action, set
//! the value, then read. Setting a field twice yields the bitwise OR of both
//! writes.

use super::keycodes::Key;

/// Mask for the action bit
const ACTION_MASK: u16 = 0x0001;
/// Mask for the value bits in packed position
const VALUE_MASK: u16 = 0xFFFE;

/// The action of a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyAction {
    /// Key went down
    Press = 0,
    /// Key went up
    Release = 1,
}

/// Key action and key value packed into 16 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    bits: u16,
}

impl KeyEvent {
    /// Largest key value that survives packing
    pub const MAX_VALUE: u16 = 0x7FFF;

    /// Create an event carrying only `action`; the value bits are zero
    pub fn new(action: KeyAction) -> Self {
        let mut event = Self { bits: 0 };
        event.set_action(action);
        event
    }

    /// Create an event with both fields set once
    pub fn with_value(action: KeyAction, value: u16) -> Self {
        let mut event = Self::new(action);
        event.set_value(value);
        event
    }

    /// Reinterpret raw packed bits. Every pattern is a valid event.
    pub const fn from_bits(bits: u16) -> Self {
        Self { bits }
    }

    /// The packed representation
    pub const fn bits(self) -> u16 {
        self.bits
    }

    /// Merge `value` into the value bits.
    ///
    /// Only the low 15 bits of `value` are kept; bit 15 is shifted out. The
    /// merge is an OR, so calling this twice with `a` then `b` leaves
    /// `a | b` in place, not `b`.
    pub fn set_value(&mut self, value: u16) {
        self.bits |= (value << 1) & VALUE_MASK;
    }

    /// Merge `action` into the action bit.
    ///
    /// A `Release` can't be turned back into a `Press` by this call.
    pub fn set_action(&mut self, action: KeyAction) {
        self.bits |= u16::from(action as u8) & ACTION_MASK;
    }

    /// The key value, in `0..=MAX_VALUE`
    pub const fn value(self) -> u16 {
        (self.bits >> 1) & Self::MAX_VALUE
    }

    /// The key action
    pub const fn action(self) -> KeyAction {
        if self.bits & ACTION_MASK == 0 {
            KeyAction::Press
        } else {
            KeyAction::Release
        }
    }

    /// The named key for this event's value, if the platform table knows it
    pub fn key(self) -> Option<Key> {
        Key::from_code(self.value())
    }

    /// Whether this is a press event
    pub const fn is_press(self) -> bool {
        matches!(self.action(), KeyAction::Press)
    }

    /// Whether this is a release event
    pub const fn is_release(self) -> bool {
        matches!(self.action(), KeyAction::Release)
    }
}

impl std::fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.key() {
            Some(key) => write!(f, "{:?} {key:?}", self.action()),
            None => write!(f, "{:?} key 0x{:02x}", self.action(), self.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_only_action() {
        let press = KeyEvent::new(KeyAction::Press);
        assert_eq!(press.bits(), 0);
        assert_eq!(press.value(), 0);
        assert_eq!(press.action(), KeyAction::Press);

        let release = KeyEvent::new(KeyAction::Release);
        assert_eq!(release.bits(), 1);
        assert_eq!(release.value(), 0);
        assert_eq!(release.action(), KeyAction::Release);
    }

    #[test]
    fn test_round_trip_across_value_range() {
        for action in [KeyAction::Press, KeyAction::Release] {
            for value in (0..=KeyEvent::MAX_VALUE).step_by(97).chain([KeyEvent::MAX_VALUE]) {
                let event = KeyEvent::with_value(action, value);
                assert_eq!(event.action(), action, "action for value {value}");
                assert_eq!(event.value(), value, "value for action {action:?}");
            }
        }
    }

    #[test]
    fn test_fields_do_not_disturb_each_other() {
        let mut event = KeyEvent::new(KeyAction::Release);
        event.set_value(0x26);
        assert_eq!(event.action(), KeyAction::Release);
        assert_eq!(event.value(), 0x26);
        assert_eq!(event.bits(), (0x26 << 1) | 1);
    }

    #[test]
    fn test_set_value_twice_or_merges() {
        let mut event = KeyEvent::new(KeyAction::Press);
        event.set_value(0b0101);
        event.set_value(0b0011);
        assert_eq!(event.value(), 0b0111);
        assert_ne!(event.value(), 0b0011);
    }

    #[test]
    fn test_set_action_or_merges() {
        let mut event = KeyEvent::new(KeyAction::Release);
        event.set_action(KeyAction::Press);
        assert_eq!(event.action(), KeyAction::Release);
    }

    #[test]
    fn test_wide_value_is_truncated_to_15_bits() {
        let event = KeyEvent::with_value(KeyAction::Press, 0x8000 | 0x41);
        assert_eq!(event.value(), 0x41);
        assert_eq!(event.action(), KeyAction::Press);

        let event = KeyEvent::with_value(KeyAction::Release, u16::MAX);
        assert_eq!(event.value(), KeyEvent::MAX_VALUE);
        assert_eq!(event.action(), KeyAction::Release);
    }

    #[test]
    fn test_every_bit_pattern_decodes() {
        for bits in [0u16, 1, 0xFFFE, 0xFFFF, 0x8000, 0x1234] {
            let event = KeyEvent::from_bits(bits);
            assert_eq!(event.value(), bits >> 1);
            assert_eq!(event.is_release(), bits & 1 == 1);
        }
    }

    #[test]
    fn test_named_key_lookup() {
        let event = KeyEvent::with_value(KeyAction::Press, Key::Esc.code());
        assert_eq!(event.key(), Some(Key::Esc));
        assert_eq!(event.to_string(), "Press Esc");

        let unknown = KeyEvent::with_value(KeyAction::Release, 0x7e);
        assert_eq!(unknown.key(), None);
        assert_eq!(unknown.to_string(), "Release key 0x7e");
    }
}
