//! # UI Common Components
//!
//! Keyboard command translation and panel styling shared by the tester window.
//!
//! Key handling is split from the egui context so the mapping from keys to
//! [`UiCommand`]s can be exercised without a running window.

use eframe::egui::{self, Color32, Frame, Key};

/// Commands the tester window reacts to.
///
/// Every frame the pressed keys are folded into a list of commands and applied
/// in order before the input events are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    Quit,
    Next,
    Previous,
    RumbleAll,
    ToggleMode,
}

impl UiCommand {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Escape => Some(UiCommand::Quit),
            Key::ArrowRight | Key::ArrowUp => Some(UiCommand::Next),
            Key::ArrowLeft | Key::ArrowDown => Some(UiCommand::Previous),
            Key::R => Some(UiCommand::RumbleAll),
            Key::Tab => Some(UiCommand::ToggleMode),
            _ => None,
        }
    }
}

/// Maps pressed keys to commands, keeping press order and dropping unbound keys
pub fn commands_from_keys(keys: &[Key]) -> Vec<UiCommand> {
    keys.iter().filter_map(|key| UiCommand::from_key(*key)).collect()
}

/// Keys pressed this frame, in the order egui received them
pub fn pressed_keys(ctx: &egui::Context) -> Vec<Key> {
    ctx.input(|i| {
        i.events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    ..
                } => Some(*key),
                _ => None,
            })
            .collect()
    })
}

pub struct UiColors;

impl UiColors {
    pub const BACKGROUND: Color32 = Color32::BLACK;
    pub const TEXT: Color32 = Color32::WHITE;
}

pub fn panel_frame() -> Frame {
    Frame::new()
        .fill(UiColors::BACKGROUND)
        .inner_margin(egui::Margin::same(10))
}
