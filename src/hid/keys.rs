//! # Handset Keys
//!
//! | Key | Wire name | | Key | Wire name |
//! |-----|-----------|-|-----|-----------|
//! | 0-9 | `"0"`..`"9"` | | Up | `Up` |
//! | Scroll up | `ScrollUp` | | Down | `Down` |
//! | Scroll down | `ScrollDn` | | Esc | `ESC` |
//! | Left | `Left` | | Setup | `Setup` |
//! | Right | `Right` | | Enter | `Enter` |
//!
//! Discriminants fit one byte so a key can live in an atomic slot.

/// A handset button; `Undefined` means "no key pending"
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Key {
    #[default]
    Undefined = 0,
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    ScrollDn,
    ScrollUp,
    Right,
    Left,
    Up,
    Down,
    Esc,
    Setup,
    Enter,
}

const ALL_KEYS: [Key; 20] = [
    Key::Undefined,
    Key::Zero,
    Key::One,
    Key::Two,
    Key::Three,
    Key::Four,
    Key::Five,
    Key::Six,
    Key::Seven,
    Key::Eight,
    Key::Nine,
    Key::ScrollDn,
    Key::ScrollUp,
    Key::Right,
    Key::Left,
    Key::Up,
    Key::Down,
    Key::Esc,
    Key::Setup,
    Key::Enter,
];

impl Key {
    /// Decode a slot value; unknown bytes are `Undefined`
    pub fn from_u8(value: u8) -> Self {
        ALL_KEYS.get(value as usize).copied().unwrap_or(Key::Undefined)
    }

    /// Name used on the wire and on the host keypad
    pub fn name(self) -> &'static str {
        match self {
            Key::Undefined => "Undefined",
            Key::Zero => "0",
            Key::One => "1",
            Key::Two => "2",
            Key::Three => "3",
            Key::Four => "4",
            Key::Five => "5",
            Key::Six => "6",
            Key::Seven => "7",
            Key::Eight => "8",
            Key::Nine => "9",
            Key::ScrollDn => "ScrollDn",
            Key::ScrollUp => "ScrollUp",
            Key::Right => "Right",
            Key::Left => "Left",
            Key::Up => "Up",
            Key::Down => "Down",
            Key::Esc => "ESC",
            Key::Setup => "Setup",
            Key::Enter => "Enter",
        }
    }

    /// Inverse of [`Key::name`]; unknown names are `Undefined`
    pub fn from_name(name: &str) -> Self {
        ALL_KEYS
            .into_iter()
            .skip(1)
            .find(|key| key.name() == name)
            .unwrap_or(Key::Undefined)
    }

    pub fn is_digit(self) -> bool {
        self.digit().is_some()
    }

    /// The character a digit key types
    pub fn digit(self) -> Option<char> {
        let value = self as u8;
        if (Key::Zero as u8..=Key::Nine as u8).contains(&value) {
            char::from_digit((value - Key::Zero as u8) as u32, 10)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
