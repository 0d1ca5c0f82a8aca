use eframe::egui;

use crate::state::{AppState, ViewMode};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DeViewerApp {
    pub state: AppState,
}

impl DeViewerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DeViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and portal cascade ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: column summary or DE controls ----
        egui::SidePanel::left("side_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: table, or PCA and volcano side by side ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.view {
            ViewMode::Table => table::table_view(ui, &self.state),
            ViewMode::DifferentialExpression => {
                ui.columns(2, |columns| {
                    columns[0].heading("PCA");
                    plot::pca_plot(&mut columns[0], &self.state);
                    columns[1].heading("Volcano");
                    plot::volcano_plot(&mut columns[1], &self.state);
                });
            }
        });
    }
}
