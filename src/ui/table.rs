use eframe::egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Generic table view (central panel)
// ---------------------------------------------------------------------------

/// Render the loaded table, capped at `viewer.max_rows` rows.
pub fn table_view(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.table else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Pick a file above, or open one (File → Open…)");
        });
        return;
    };

    let shown = table.len().min(state.config.viewer.max_rows);
    let source = state.table_source.as_deref().unwrap_or_default();
    ui.label(
        RichText::new(format!(
            "{source}: {} rows x {} columns (showing {shown})",
            table.len(),
            table.headers.len()
        ))
        .weak(),
    );
    ui.separator();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .columns(Column::auto().at_least(60.0).clip(true), table.headers.len())
        .header(20.0, |mut header| {
            for name in &table.headers {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, shown, |mut row| {
                let cells = &table.rows[row.index()];
                for cell in cells {
                    row.col(|ui| {
                        ui.label(cell);
                    });
                }
            });
        });
}
