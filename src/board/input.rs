//! User input delivered to a board between frames

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;

/// Whether a key went down or came back up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAction {
    Down,
    Up,
}

impl KeyAction {
    fn prefix(&self) -> &'static str {
        match self {
            KeyAction::Down => "keydown",
            KeyAction::Up => "keyup",
        }
    }
}

/// A key transition, written `keydown:<key>` or `keyup:<key>`.
///
/// Key names are lowercase ASCII letters, digits and underscores
/// (`space`, `a`, `1`, `left_shift`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key: String,
}

impl KeyEvent {
    pub fn down(key: &str) -> Self {
        Self {
            action: KeyAction::Down,
            key: key.to_ascii_lowercase(),
        }
    }

    pub fn up(key: &str) -> Self {
        Self {
            action: KeyAction::Up,
            key: key.to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action.prefix(), self.key)
    }
}

impl FromStr for KeyEvent {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || BoardError::InvalidKey(s.to_string());
        let (prefix, key) = s.trim().split_once(':').ok_or_else(bad)?;
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(bad());
        }
        match prefix.to_ascii_lowercase().as_str() {
            "keydown" => Ok(Self::down(key)),
            "keyup" => Ok(Self::up(key)),
            _ => Err(bad()),
        }
    }
}

/// Something the player did, queued for the next frame
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Pointer held down at board position (x, y)
    PointerDrag { x: f64, y: f64 },
    PointerRelease,
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        InputEvent::Key(event)
    }
}
