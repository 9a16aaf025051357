use std::{fmt, str::FromStr};

use crate::error::KeyParseError;

/// A key that can flip the clicker on and off.
///
/// Parsed case-insensitively from free text, so `"F9"`, `"f9"` and `" f9 "` all
/// name the same key. Character keys are stored lowercased.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToggleKey {
    Char(char),
    /// Function key `F1`..=`F12`.
    Function(u8),
    Space,
    Tab,
    Escape,
    Enter,
    Backspace,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
    CapsLock,
    Pause,
    PrintScreen,
    ScrollLock,
}

const NAMED: &[(&str, ToggleKey)] = &[
    ("space", ToggleKey::Space),
    ("tab", ToggleKey::Tab),
    ("esc", ToggleKey::Escape),
    ("escape", ToggleKey::Escape),
    ("enter", ToggleKey::Enter),
    ("return", ToggleKey::Enter),
    ("backspace", ToggleKey::Backspace),
    ("insert", ToggleKey::Insert),
    ("ins", ToggleKey::Insert),
    ("delete", ToggleKey::Delete),
    ("del", ToggleKey::Delete),
    ("home", ToggleKey::Home),
    ("end", ToggleKey::End),
    ("pageup", ToggleKey::PageUp),
    ("pgup", ToggleKey::PageUp),
    ("pagedown", ToggleKey::PageDown),
    ("pgdn", ToggleKey::PageDown),
    ("up", ToggleKey::Up),
    ("down", ToggleKey::Down),
    ("left", ToggleKey::Left),
    ("right", ToggleKey::Right),
    ("capslock", ToggleKey::CapsLock),
    ("pause", ToggleKey::Pause),
    ("printscreen", ToggleKey::PrintScreen),
    ("prtsc", ToggleKey::PrintScreen),
    ("scrolllock", ToggleKey::ScrollLock),
];

pub const MAX_FUNCTION_KEY: u8 = 12;

impl ToggleKey {
    /// Character key for `c`, or `None` for whitespace and control characters.
    pub fn from_char(c: char) -> Option<Self> {
        if c.is_whitespace() || c.is_control() {
            return None;
        }
        Some(Self::Char(c.to_lowercase().next().unwrap_or(c)))
    }
}

impl FromStr for ToggleKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::from_char(c).ok_or_else(|| KeyParseError::Unknown(text.to_owned()));
        }

        let lower: String = text
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            return if (1..=MAX_FUNCTION_KEY).contains(&n) {
                Ok(Self::Function(n))
            } else {
                Err(KeyParseError::Unknown(text.to_owned()))
            };
        }

        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, key)| *key)
            .ok_or_else(|| KeyParseError::Unknown(text.to_owned()))
    }
}

impl fmt::Display for ToggleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => {
                let mut upper = c.to_uppercase();
                match (upper.next(), upper.next()) {
                    (Some(u), None) => write!(f, "{u}"),
                    // `ß` and friends widen when uppercased and would not parse back.
                    _ => write!(f, "{c}"),
                }
            }
            Self::Function(n) => write!(f, "F{n}"),
            Self::Space => f.write_str("Space"),
            Self::Tab => f.write_str("Tab"),
            Self::Escape => f.write_str("Esc"),
            Self::Enter => f.write_str("Enter"),
            Self::Backspace => f.write_str("Backspace"),
            Self::Insert => f.write_str("Insert"),
            Self::Delete => f.write_str("Delete"),
            Self::Home => f.write_str("Home"),
            Self::End => f.write_str("End"),
            Self::PageUp => f.write_str("PageUp"),
            Self::PageDown => f.write_str("PageDown"),
            Self::Up => f.write_str("Up"),
            Self::Down => f.write_str("Down"),
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
            Self::CapsLock => f.write_str("CapsLock"),
            Self::Pause => f.write_str("Pause"),
            Self::PrintScreen => f.write_str("PrintScreen"),
            Self::ScrollLock => f.write_str("ScrollLock"),
        }
    }
}
