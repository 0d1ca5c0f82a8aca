use std::collections::BTreeMap;

use eframe::egui::{Color32, Ui};
use egui_plot::{HLine, Legend, Plot, PlotPoints, Points, VLine};

use crate::analysis::volcano::{Significance, neg_log10};
use crate::color::significance_color;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// PCA scatter
// ---------------------------------------------------------------------------

/// PC1 vs PC2, one series per value of the colour-by column.
pub fn pca_plot(ui: &mut Ui, state: &AppState) {
    let (Some(ds), Some(pca)) = (&state.de, &state.pca) else {
        let msg = state
            .pca_error
            .as_deref()
            .unwrap_or("Select a dataset to compute the PCA");
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(msg);
        });
        return;
    };

    let color_col = state.color_column.as_deref();

    // Group points by colour value so each gets one legend entry.
    let mut series: BTreeMap<String, (Color32, Vec<[f64; 2]>)> = BTreeMap::new();
    for (sample, xy) in pca.samples.iter().zip(pca.top_two()) {
        let value = color_col.and_then(|col| ds.metadata.value(sample, col));
        let name = value
            .map(|v| v.to_string())
            .unwrap_or_else(|| sample.clone());
        let color = value
            .zip(state.color_map.as_ref())
            .map(|(v, cm)| cm.color_for(v))
            .unwrap_or(Color32::LIGHT_BLUE);
        series.entry(name).or_insert((color, Vec::new())).1.push(xy);
    }

    Plot::new("pca_plot")
        .legend(Legend::default())
        .x_axis_label(pca.axis_label(0))
        .y_axis_label(pca.axis_label(1))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (name, (color, points)) in series {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(name)
                        .color(color)
                        .radius(5.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Volcano scatter
// ---------------------------------------------------------------------------

/// logFC vs −log10(p-value) for the selected comparison, with cutoff guides.
pub fn volcano_plot(ui: &mut Ui, state: &AppState) {
    if state.volcano.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Select a comparison to draw the volcano plot");
        });
        return;
    }

    let mut series: BTreeMap<Significance, Vec<[f64; 2]>> = BTreeMap::new();
    for p in &state.volcano {
        series.entry(p.significance).or_default().push([p.x, p.y]);
    }

    // Hover label: the gene under the cursor.
    let genes: Vec<([f64; 2], String)> = state
        .volcano
        .iter()
        .map(|p| ([p.x, p.y], hover_name(&p.gene_id, &p.gene_name)))
        .collect();

    let lfc = state.cutoffs.lfc;
    let title = state.comparison.clone().unwrap_or_default();
    Plot::new("volcano_plot")
        .legend(Legend::default())
        .label_formatter(move |_series, value| {
            let coords = format!("logFC {:.2}\n-log10 p {:.2}", value.x, value.y);
            match genes.iter().find(|(xy, _)| xy[0] == value.x && xy[1] == value.y) {
                Some((_, gene)) => format!("{gene}\n{coords}"),
                None => coords,
            }
        })
        .x_axis_label(format!("log2 fold change ({title})"))
        .y_axis_label("-log10(p-value)")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (significance, points) in series {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(significance.label())
                        .color(significance_color(significance))
                        .radius(2.5),
                );
            }
            let guide = Color32::from_gray(140);
            plot_ui.vline(VLine::new(-lfc).color(guide));
            plot_ui.vline(VLine::new(lfc).color(guide));
            // Guide only: the y axis is the p-value, the cutoff applies to FDR.
            plot_ui.hline(HLine::new(neg_log10(state.cutoffs.fdr)).color(guide));
        });
}

fn hover_name(gene_id: &str, gene_name: &str) -> String {
    if gene_id == gene_name {
        gene_id.to_string()
    } else {
        format!("{gene_name} ({gene_id})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_name_adds_id_only_when_it_differs() {
        assert_eq!(hover_name("ENSG1", "TP53"), "TP53 (ENSG1)");
        assert_eq!(hover_name("g1", "g1"), "g1");
    }
}
