mod analysis;
mod app;
mod color;
mod config;
mod data;
mod error;
mod portal;
mod state;
mod ui;

use app::DeViewerApp;
use config::Config;
use eframe::egui;
use portal::Selection;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match Config::load_default() {
        Ok(Some(config)) => config,
        Ok(None) => Config::default(),
        Err(e) => {
            log::error!("{e:#}; using default configuration");
            Config::default()
        }
    };

    // Optional first argument: a saved link such as `?domain=lab&project=p1`.
    let initial = std::env::args()
        .nth(1)
        .map(|q| Selection::from_query(&q))
        .unwrap_or_default();
    log::info!("Starting with selection {:?}", initial);

    let state = AppState::new(config, initial);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "DE Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(DeViewerApp::new(state)))),
    )
}
