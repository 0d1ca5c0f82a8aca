use serde::{Deserialize, Serialize};

use crate::data::model::{ComparisonResult, GeneStat};

/// Thresholds a gene must pass to count as differentially expressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cutoffs {
    /// Maximum FDR (inclusive).
    pub fdr: f64,
    /// Minimum absolute log2 fold change (inclusive).
    pub lfc: f64,
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self { fdr: 0.05, lfc: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Significance {
    Up,
    Down,
    NotSignificant,
}

impl Significance {
    pub fn label(self) -> &'static str {
        match self {
            Significance::Up => "Up",
            Significance::Down => "Down",
            Significance::NotSignificant => "Not significant",
        }
    }
}

pub fn classify(stat: &GeneStat, cutoffs: Cutoffs) -> Significance {
    // NaN compares false, so NA statistics never pass.
    if stat.fdr <= cutoffs.fdr && stat.log_fc.abs() >= cutoffs.lfc {
        if stat.log_fc > 0.0 {
            Significance::Up
        } else {
            Significance::Down
        }
    } else {
        Significance::NotSignificant
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolcanoPoint {
    pub gene_id: String,
    pub gene_name: String,
    /// log2 fold change
    pub x: f64,
    /// −log10(p-value)
    pub y: f64,
    pub significance: Significance,
}

/// Plot coordinates for every gene with a finite logFC and p-value.
pub fn volcano_points(comparison: &ComparisonResult, cutoffs: Cutoffs) -> Vec<VolcanoPoint> {
    comparison
        .genes
        .iter()
        .filter(|g| g.log_fc.is_finite() && g.p_value.is_finite())
        .map(|g| VolcanoPoint {
            gene_id: g.gene_id.clone(),
            gene_name: g.gene_name.clone(),
            x: g.log_fc,
            y: neg_log10(g.p_value),
            significance: classify(g, cutoffs),
        })
        .collect()
}

/// `-log10(p)`, with `p == 0` clamped to the smallest positive double.
pub fn neg_log10(p: f64) -> f64 {
    -p.max(f64::MIN_POSITIVE).log10()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolcanoSummary {
    pub up: usize,
    pub down: usize,
    pub not_significant: usize,
}

pub fn summarize(points: &[VolcanoPoint]) -> VolcanoSummary {
    points
        .iter()
        .fold(VolcanoSummary::default(), |mut acc, p| {
            match p.significance {
                Significance::Up => acc.up += 1,
                Significance::Down => acc.down += 1,
                Significance::NotSignificant => acc.not_significant += 1,
            }
            acc
        })
}
