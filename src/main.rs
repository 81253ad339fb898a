pub mod config;
pub mod controller;
pub mod ui;

#[cfg(test)]
mod test_support;

use crate::config::{AppConfig, LoggingConfig};
use crate::controller::{EventDispatcher, GilrsInput};
use crate::ui::ControllerTestUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use std::fs::File;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    setup()?;

    let config_path = AppConfig::default_path()?;
    let config = AppConfig::load_or_create(&config_path)?;
    setup_logging(&config.logging)?;

    info!("Program started.");
    info!("Using configuration {}", config_path.display());

    // Initialize the input backend
    let input = GilrsInput::create(&config.input)?.initialize();
    let dispatcher =
        EventDispatcher::new(input, config.input.attach_policy, config.rumble.clone());
    let description = dispatcher.description();
    info!("{}", description);

    // Start the UI
    info!("Starting UI");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.display.width, config.display.height])
            .with_title(format!("Controller Testing ({})", description)),
        ..Default::default()
    };

    let display = config.display.clone();
    eframe::run_native(
        "controllertest",
        native_options,
        Box::new(|cc| {
            cc.egui_ctx.set_theme(egui::Theme::Dark);
            Ok(Box::new(ControllerTestUI::new(dispatcher, display)))
        }),
    )
    .map_err(|e| eyre!("UI terminated with an error: {}", e))?;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging(logging: &LoggingConfig) -> Result<()> {
    let level = logging.level()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if logging.file.as_os_str().is_empty() {
        builder.pretty().init();
    } else {
        // Truncated on every start
        let file = File::create(&logging.file)
            .map_err(|e| eyre!("Cannot open log file {}: {}", logging.file.display(), e))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    Ok(())
}
