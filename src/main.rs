mod app;
mod color;
mod config;
mod data;
mod regression;
mod report;
mod state;
mod stats;
mod ui;

#[cfg(test)]
mod fixtures;

use app::ZinbApp;
use config::AppConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        log::error!("Failed to load config, using defaults: {e:#}");
        AppConfig::default()
    });
    log::debug!("config: {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty ZINB – Panel Count Regression",
        options,
        Box::new(|_cc| Ok(Box::new(ZinbApp::new(config)))),
    )
}
