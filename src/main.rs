#![cfg_attr(windows, windows_subsystem = "windows")]

mod app;
mod async_config;
mod config;
mod engine;
mod logger;
mod model;
mod popup;
mod state;
mod styles;
mod timefmt;

fn main() -> eframe::Result<()> {
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size([520.0, 640.0])
        .with_min_inner_size([360.0, 420.0]);
    eframe::run_native(
        concat!("LoftSync - v", env!("CARGO_PKG_VERSION")),
        native_options,
        Box::new(|_cc| Ok(Box::new(app::AppState::new()))),
    )
}
