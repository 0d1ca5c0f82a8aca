use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::analysis::volcano::Significance;
use crate::data::model::{MetadataValue, SampleMetadata};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let rgb: Srgb = Hsl::new(hue, 0.75, 0.5).into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Fixed volcano colours: up red, down blue, rest grey.
pub fn significance_color(significance: Significance) -> Color32 {
    match significance {
        Significance::Up => Color32::from_rgb(0xe4, 0x4c, 0x37),
        Significance::Down => Color32::from_rgb(0x59, 0xbc, 0xcb),
        Significance::NotSignificant => Color32::GRAY,
    }
}

// ---------------------------------------------------------------------------
// Colour-by mapping: sample → Color32 through one metadata column
// ---------------------------------------------------------------------------

/// Maps the values of one metadata column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<MetadataValue, Color32>,
}

impl ColorMap {
    pub fn new(values: &BTreeSet<MetadataValue>) -> Self {
        let mapping = values
            .iter()
            .cloned()
            .zip(generate_palette(values.len()))
            .collect();
        ColorMap { mapping }
    }

    /// Colour map for a metadata column, or `None` if the column is unknown.
    pub fn for_column(metadata: &SampleMetadata, column: &str) -> Option<Self> {
        metadata
            .unique_values
            .get(column)
            .map(Self::new)
    }

    pub fn color_for(&self, value: &MetadataValue) -> Color32 {
        self.mapping.get(value).copied().unwrap_or(Color32::GRAY)
    }

    /// Legend entries (value label → colour), sorted by value.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.to_string(), *c))
            .collect()
    }
}
