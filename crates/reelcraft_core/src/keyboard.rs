//! Keyboard shortcuts of the editing surface.

use crate::types::TimeUs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Delete,
    Backspace,
    Space,
    ArrowLeft,
    ArrowRight,
    Escape,
    Char(char),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    /// Cmd on macOS; treated the same as Ctrl.
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
    /// Focus is in a text field; shortcuts stay out of the way.
    pub in_text_input: bool,
}

impl KeyInput {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            in_text_input: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    DeleteSelected,
    Split,
    Copy,
    Paste,
    TogglePlay,
    /// Relative seek.
    Seek(TimeUs),
    OpenHelp,
    Escape,
}

const SEEK_FINE: TimeUs = TimeUs(100_000);
const SEEK_SHIFT: TimeUs = TimeUs(1_000_000);
const SEEK_COMMAND: TimeUs = TimeUs(5_000_000);

/// Map a key press to an editor command, if it has one.
pub fn map_key(input: &KeyInput) -> Option<KeyCommand> {
    if input.in_text_input {
        return None;
    }
    let m = input.modifiers;
    let command = match input.key {
        Key::Delete | Key::Backspace => KeyCommand::DeleteSelected,
        Key::Space => KeyCommand::TogglePlay,
        Key::Escape => KeyCommand::Escape,
        Key::ArrowLeft => KeyCommand::Seek(-seek_step(m)),
        Key::ArrowRight => KeyCommand::Seek(seek_step(m)),
        Key::Char('?') => KeyCommand::OpenHelp,
        Key::Char(c) if m.command() => match c.to_ascii_lowercase() {
            'b' => KeyCommand::Split,
            'c' => KeyCommand::Copy,
            'v' => KeyCommand::Paste,
            _ => return None,
        },
        Key::Char(_) => return None,
    };
    Some(command)
}

fn seek_step(m: Modifiers) -> TimeUs {
    if m.command() {
        SEEK_COMMAND
    } else if m.shift {
        SEEK_SHIFT
    } else {
        SEEK_FINE
    }
}
