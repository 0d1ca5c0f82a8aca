use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::analysis::volcano::Cutoffs;
use crate::data::loader::Separator;
use crate::state::{AppState, ViewMode};

// ---------------------------------------------------------------------------
// Top bar – menu, view switch and the portal cascade
// ---------------------------------------------------------------------------

/// Render the top menu, view switch and project → dataset → file selectors.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        for (mode, label) in [
            (ViewMode::Table, "Table"),
            (ViewMode::DifferentialExpression, "Differential Expression"),
        ] {
            if ui.selectable_label(state.view == mode, label).clicked() && state.view != mode {
                state.set_view(mode);
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });

    ui.horizontal_wrapped(|ui: &mut Ui| {
        cascade(ui, state);
    });

    let query = state.query_string();
    if !query.is_empty() {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(RichText::new("Link:").weak());
            ui.monospace(format!("?{query}"));
            if ui.small_button("Copy").clicked() {
                ui.ctx().copy_text(format!("?{query}"));
            }
        });
    }
}

/// One combo box of the cascade; returns the newly picked value, if any.
fn picker(
    ui: &mut Ui,
    id: &str,
    label: &str,
    current: Option<&str>,
    options: &[(String, String)],
) -> Option<String> {
    let mut picked = None;
    ui.label(label);
    let selected_text = current
        .and_then(|c| options.iter().find(|(value, _)| value == c))
        .map(|(_, name)| name.clone())
        .unwrap_or_else(|| "—".to_string());
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            for (value, name) in options {
                if ui
                    .selectable_label(current == Some(value.as_str()), name)
                    .clicked()
                    && current != Some(value.as_str())
                {
                    picked = Some(value.clone());
                }
            }
        });
    picked
}

fn pairs(values: &[String]) -> Vec<(String, String)> {
    values.iter().map(|v| (v.clone(), v.clone())).collect()
}

fn cascade(ui: &mut Ui, state: &mut AppState) {
    let domains: Vec<String> = state.config.domains.keys().cloned().collect();
    if let Some(d) = picker(
        ui,
        "domain",
        "Domain",
        state.selection.domain.as_deref(),
        &pairs(&domains),
    ) {
        state.select_domain(Some(d));
    }

    if state.selection.domain.is_none() {
        return;
    }
    if let Some(p) = picker(
        ui,
        "project",
        "Project",
        state.selection.project.as_deref(),
        &pairs(&state.projects),
    ) {
        state.select_project(Some(p));
    }

    if state.selection.project.is_none() {
        return;
    }
    let datasets: Vec<(String, String)> = state
        .visible_datasets()
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();
    if let Some(d) = picker(
        ui,
        "dataset",
        "Dataset",
        state.selection.dataset.as_deref(),
        &datasets,
    ) {
        state.select_dataset(Some(d));
    }

    if state.view != ViewMode::Table || state.selection.dataset.is_none() {
        return;
    }
    if let Some(f) = picker(
        ui,
        "file",
        "File",
        state.selection.file.as_deref(),
        &pairs(&state.files),
    ) {
        state.select_file(Some(f));
    }

    let current = state.separator();
    ui.label("Field Separator");
    egui::ComboBox::from_id_salt("sep")
        .selected_text(current.name())
        .show_ui(ui, |ui: &mut Ui| {
            for sep in Separator::ALL {
                if ui.selectable_label(current == sep, sep.name()).clicked() && current != sep {
                    state.set_separator(sep);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Left side panel
// ---------------------------------------------------------------------------

/// Render the left panel: column summary for tables, controls for DE.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    match state.view {
        ViewMode::Table => table_summary(ui, state),
        ViewMode::DifferentialExpression => de_controls(ui, state),
    }
}

fn table_summary(ui: &mut Ui, state: &AppState) {
    ui.heading("Columns");
    ui.separator();
    if state.table.is_none() {
        ui.label("No table loaded.");
        return;
    }
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for col in &state.column_summary {
                ui.strong(&col.name);
                let detail = match col.range {
                    Some((min, max)) => format!("{} values, {min} – {max}", col.non_empty),
                    None => format!("{} values", col.non_empty),
                };
                ui.label(RichText::new(detail).weak());
            }
        });
}

fn de_controls(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Differential Expression");
    ui.separator();

    let Some(ds) = &state.de else {
        ui.label("Select a dataset with comparison results.");
        return;
    };

    // Clone what we need so we can mutate state inside the closures.
    let comparisons: Vec<String> = ds.comparisons.iter().map(|c| c.name.clone()).collect();
    let columns = ds.metadata.column_names.clone();
    let groups = ds.groups.clone();
    let n_samples = ds.cpm.samples.len();
    let shape = format!("{} genes x {n_samples} samples", ds.counts.genes.len());
    let zero_columns = ds.cpm.zero_columns.join(", ");

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.label(RichText::new(shape).weak());
            if !zero_columns.is_empty() {
                ui.label(
                    RichText::new(format!("No counts in {zero_columns}; CPM set to 0"))
                        .color(Color32::YELLOW),
                );
            }
            ui.separator();

            // ---- Volcano controls ----
            ui.strong("Comparison");
            let current = state.comparison.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("comparison")
                .selected_text(&current)
                .width(ui.available_width())
                .show_ui(ui, |ui: &mut Ui| {
                    for name in &comparisons {
                        if ui.selectable_label(current == *name, name).clicked() {
                            state.set_comparison(name.clone());
                        }
                    }
                });

            let mut cutoffs: Cutoffs = state.cutoffs;
            ui.horizontal(|ui: &mut Ui| {
                ui.label("FDR ≤");
                ui.add(egui::DragValue::new(&mut cutoffs.fdr).speed(0.005).range(0.0..=1.0));
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("|logFC| ≥");
                ui.add(egui::DragValue::new(&mut cutoffs.lfc).speed(0.05).range(0.0..=20.0));
            });
            if cutoffs != state.cutoffs {
                state.set_cutoffs(cutoffs);
            }
            let s = state.volcano_summary;
            ui.label(format!("{} up, {} down, {} not significant", s.up, s.down, s.not_significant));
            ui.separator();

            // ---- PCA controls ----
            ui.strong("Color by");
            let current_color_col = state.color_column.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("color_by")
                .selected_text(&current_color_col)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &columns {
                        if ui
                            .selectable_label(current_color_col == *col, col)
                            .clicked()
                        {
                            state.set_color_column(col.clone());
                        }
                    }
                });

            if let Some(cm) = &state.color_map {
                for (label, color) in cm.legend_entries() {
                    ui.label(RichText::new(format!("● {label}")).color(color));
                }
            }

            if let Some(pca) = &state.pca {
                ui.label(RichText::new(format!("PCA over {} genes", pca.genes_used)).weak());
            }
            let mut log_transform = state.log_transform;
            if ui.checkbox(&mut log_transform, "log2(CPM + 1)").changed() {
                state.set_log_transform(log_transform);
            }
            ui.separator();

            // ---- Sample groups ----
            let selected = state.selected_samples().len();
            let header = format!("Sample groups  ({selected}/{n_samples} samples)");
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("groups")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            state.select_all_groups();
                        }
                        if ui.small_button("None").clicked() {
                            state.select_no_groups();
                        }
                    });
                    for value in &groups {
                        let mut checked = state.selected_groups.contains(value);
                        if ui.checkbox(&mut checked, value.to_string()).changed() {
                            state.toggle_group(value);
                        }
                    }
                });
        });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open table")
        .add_filter("Supported files", &["csv", "tsv", "tab", "txt", "parquet", "pq", "json"])
        .add_filter("Delimited text", &["csv", "tsv", "tab", "txt"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.open_local_file(&path);
    }
}
