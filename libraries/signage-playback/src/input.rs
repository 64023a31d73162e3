//! Manual input mapping
//!
//! The hosting shell translates physical keys and remote buttons into
//! [`Key`]s; the engine only acts on four logical [`Intent`]s plus the
//! unmute gesture.

use serde::{Deserialize, Serialize};

/// Physical key or remote button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Enter,
    NumpadEnter,
    Space,
    MediaPlayPause,
    Escape,
    Backspace,
    /// Remote "back" button
    Back,
    Other,
}

impl Key {
    /// Map a DOM-style key name or code
    pub fn from_name(name: &str) -> Key {
        match name {
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "Enter" => Key::Enter,
            "NumpadEnter" => Key::NumpadEnter,
            " " | "Space" | "Spacebar" => Key::Space,
            "MediaPlayPause" => Key::MediaPlayPause,
            "Escape" | "Esc" => Key::Escape,
            "Backspace" => Key::Backspace,
            "GoBack" | "BrowserBack" | "Back" => Key::Back,
            _ => Key::Other,
        }
    }

    pub fn intent(self) -> Option<Intent> {
        match self {
            Key::ArrowLeft => Some(Intent::Previous),
            Key::ArrowRight => Some(Intent::Next),
            Key::Space | Key::MediaPlayPause => Some(Intent::TogglePause),
            Key::Escape | Key::Backspace | Key::Back => Some(Intent::Exit),
            _ => None,
        }
    }
}

/// Logical operator intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Previous,
    Next,
    TogglePause,
    Exit,
}

/// Input delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    Key(Key),
    Pointer,
}

impl InputEvent {
    pub fn intent(self) -> Option<Intent> {
        match self {
            InputEvent::Key(key) => key.intent(),
            InputEvent::Pointer => None,
        }
    }

    /// Whether this input counts as a user gesture that may request sound
    ///
    /// Directional and select keys qualify, as does any pointer press.
    /// Exit keys never do.
    pub fn is_unmute_gesture(self) -> bool {
        match self {
            InputEvent::Pointer => true,
            InputEvent::Key(key) => matches!(
                key,
                Key::ArrowLeft
                    | Key::ArrowRight
                    | Key::ArrowUp
                    | Key::ArrowDown
                    | Key::Enter
                    | Key::NumpadEnter
                    | Key::Space
                    | Key::MediaPlayPause
            ),
        }
    }
}

impl From<Key> for InputEvent {
    fn from(key: Key) -> Self {
        InputEvent::Key(key)
    }
}
