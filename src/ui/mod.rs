//! # Controller Tester User Interface
//!
//! eframe application hosting the whole tester loop. The UI thread owns the
//! [`EventDispatcher`] and with it the input backend and the registry; each
//! frame runs the same sequence:
//!
//! 1. Translate pressed keys into [`UiCommand`]s and apply them
//! 2. Drain pending input events through [`EventDispatcher::process_frame`]
//! 3. Build a [`StatusSnapshot`] for the current [`DisplaySelection`]
//! 4. Paint it as one monospace label over a black panel
//! 5. Schedule the next repaint after the configured frame interval
//!
//! Repaints are requested unconditionally so device events are picked up even
//! while the window receives no input.
//!
//! ## Shutdown
//!
//! Escape sends a close command to the viewport. Whether the window is closed
//! that way or by the window manager, [`eframe::App::on_exit`] shuts the
//! backend down and logs the end of the program.

pub mod common;

use eframe::egui::{self, RichText};
use tracing::{debug, info};

use crate::config::DisplayConfig;
use crate::controller::{DisplaySelection, EventDispatcher, InputBackend, StatusSnapshot};

use self::common::{commands_from_keys, panel_frame, pressed_keys, UiColors, UiCommand};

pub struct ControllerTestUI<B: InputBackend> {
    /// Owns the backend and the registry
    dispatcher: EventDispatcher<B>,

    /// Single/all mode and the selected controller
    selection: DisplaySelection,

    display: DisplayConfig,
}

impl<B: InputBackend> ControllerTestUI<B> {
    pub fn new(dispatcher: EventDispatcher<B>, display: DisplayConfig) -> Self {
        ControllerTestUI {
            selection: DisplaySelection::new(display.mode),
            dispatcher,
            display,
        }
    }

    /// Applies one command; returns true when the user asked to quit
    pub fn apply(&mut self, command: UiCommand) -> bool {
        let count = self.dispatcher.registry().len();
        match command {
            UiCommand::Quit => {
                info!("Quit requested");
                return true;
            }
            UiCommand::Next | UiCommand::Previous if self.dispatcher.registry().is_empty() => {
                debug!("No controllers to select");
            }
            UiCommand::Next => self.selection.next(count),
            UiCommand::Previous => self.selection.previous(count),
            UiCommand::RumbleAll => self.dispatcher.rumble_all(),
            UiCommand::ToggleMode => {
                self.selection.toggle_mode();
                debug!("Display mode is now {:?}", self.selection.mode());
            }
        }
        false
    }

    /// One frame of the tester loop without any painting
    pub fn step(&mut self, commands: &[UiCommand]) -> (StatusSnapshot, bool) {
        let mut quit = false;
        for command in commands {
            quit |= self.apply(*command);
        }
        self.dispatcher.process_frame();
        (self.dispatcher.snapshot(&mut self.selection), quit)
    }

    #[cfg(test)]
    pub fn selection(&self) -> &DisplaySelection {
        &self.selection
    }

    #[cfg(test)]
    pub fn dispatcher(&self) -> &EventDispatcher<B> {
        &self.dispatcher
    }
}

impl<B: InputBackend> eframe::App for ControllerTestUI<B> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let commands = commands_from_keys(&pressed_keys(ctx));
        let (snapshot, quit) = self.step(&commands);

        if quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        let wrap_width = (ctx.screen_rect().width() - 20.0).max(0.0);
        egui::CentralPanel::default()
            .frame(panel_frame())
            .show(ctx, |ui| {
                ui.set_max_width(wrap_width);
                ui.add(
                    egui::Label::new(
                        RichText::new(snapshot.to_string())
                            .monospace()
                            .size(self.display.font_size)
                            .color(UiColors::TEXT),
                    )
                    .wrap(),
                );
            });

        ctx.request_repaint_after(self.display.frame_interval());
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.dispatcher.shutdown();
        info!("Program ended.");
    }
}
