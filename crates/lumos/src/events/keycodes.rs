//! Platform key codes
//!
//! Values are X11 key codes as produced by the evdev driver (Linux scancode + 8).

/// Keys known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Key {
    /// Escape
    Esc = 0x09,
    /// W
    W = 0x19,
    /// A
    A = 0x26,
    /// S
    S = 0x27,
    /// D
    D = 0x28,
    /// Space bar
    Space = 0x41,
    /// F1
    F1 = 0x43,
    /// F2
    F2 = 0x44,
    /// F3
    F3 = 0x45,
    /// F4
    F4 = 0x46,
    /// Keypad minus
    Sub = 0x52,
    /// Keypad plus
    Add = 0x56,
}

impl Key {
    /// Every key in the table
    pub const ALL: [Self; 12] = [
        Self::Esc,
        Self::W,
        Self::A,
        Self::S,
        Self::D,
        Self::Space,
        Self::F1,
        Self::F2,
        Self::F3,
        Self::F4,
        Self::Sub,
        Self::Add,
    ];

    /// The native code of this key
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Look up the key for a native code
    pub const fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0x09 => Self::Esc,
            0x19 => Self::W,
            0x26 => Self::A,
            0x27 => Self::S,
            0x28 => Self::D,
            0x41 => Self::Space,
            0x43 => Self::F1,
            0x44 => Self::F2,
            0x45 => Self::F3,
            0x46 => Self::F4,
            0x52 => Self::Sub,
            0x56 => Self::Add,
            _ => return None,
        })
    }
}

impl TryFrom<u16> for Key {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_lookup_is_consistent() {
        for key in Key::ALL {
            assert_eq!(Key::from_code(key.code()), Some(key));
        }
    }

    #[test]
    fn test_function_keys_are_contiguous() {
        assert_eq!(Key::F2.code(), Key::F1.code() + 1);
        assert_eq!(Key::F3.code(), Key::F1.code() + 2);
        assert_eq!(Key::F4.code(), Key::F1.code() + 3);
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(Key::from_code(0), None);
        assert_eq!(Key::try_from(0x7f), Err(0x7f));
        assert_eq!(Key::try_from(0x52), Ok(Key::Sub));
    }
}
