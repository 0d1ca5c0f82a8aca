use std::collections::{BTreeSet, HashMap};

use log::{info, warn};
use ndarray::Array2;

use crate::data::model::{ComparisonResult, MetadataValue, SampleMetadata};
use crate::error::AnalysisError;

const PER_MILLION: f64 = 1_000_000.0;

/// Gene × sample read counts unioned across all comparisons.
/// `None` marks a cell no comparison covered.
#[derive(Debug, Clone)]
pub struct UnifiedCounts {
    pub genes: Vec<String>,
    pub samples: Vec<String>,
    pub values: Array2<Option<f64>>,
}

#[cfg(test)]
impl UnifiedCounts {
    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == sample)
    }

    pub fn get(&self, gene: &str, sample: &str) -> Option<f64> {
        let row = self.genes.iter().position(|g| g == gene)?;
        let col = self.sample_index(sample)?;
        self.values[[row, col]]
    }
}

/// Counts-per-million with the same rows and columns as the source [`UnifiedCounts`].
#[derive(Debug, Clone)]
pub struct Cpm {
    pub samples: Vec<String>,
    pub values: Array2<Option<f64>>,
    /// Samples whose counts summed to zero; their set cells are `0.0`.
    pub zero_columns: Vec<String>,
}

/// Everything the DE viewer needs for one dataset selection.
#[derive(Debug, Clone)]
pub struct DeDataset {
    pub metadata: SampleMetadata,
    pub comparisons: Vec<ComparisonResult>,
    pub counts: UnifiedCounts,
    pub cpm: Cpm,
    pub groups: BTreeSet<MetadataValue>,
}

impl DeDataset {
    pub fn comparison(&self, name: &str) -> Option<&ComparisonResult> {
        self.comparisons.iter().find(|c| c.name == name)
    }
}

/// Aggregate a metadata table and its comparisons into a [`DeDataset`].
///
/// Comparisons are ordered by name, which also fixes the gene row order
/// (first seen wins).
pub fn aggregate(
    metadata: SampleMetadata,
    mut comparisons: Vec<ComparisonResult>,
) -> Result<DeDataset, AnalysisError> {
    comparisons.sort_by(|a, b| a.name.cmp(&b.name));

    let counts = unify_counts(&metadata, &comparisons)?;
    let cpm = counts_per_million(&counts);
    let groups = infer_groups(&metadata);

    info!(
        "Aggregated {} comparisons into {} genes x {} samples ({} groups)",
        comparisons.len(),
        counts.genes.len(),
        counts.samples.len(),
        groups.len()
    );

    Ok(DeDataset {
        metadata,
        comparisons,
        counts,
        cpm,
        groups,
    })
}

/// Union the per-comparison count columns into a single matrix.
///
/// Only count columns naming a metadata sample are kept. A comparison that
/// keeps none of its columns is an error. Where two comparisons cover the
/// same cell, the first value seen is kept.
pub fn unify_counts(
    metadata: &SampleMetadata,
    comparisons: &[ComparisonResult],
) -> Result<UnifiedCounts, AnalysisError> {
    let mut gene_rows: HashMap<String, usize> = HashMap::new();
    let mut genes: Vec<String> = Vec::new();
    let mut seen_samples = vec![false; metadata.len()];
    // (gene row, metadata position, value)
    let mut cells: Vec<(usize, usize, f64)> = Vec::new();

    for cmp in comparisons {
        let shared: Vec<(usize, usize)> = cmp
            .count_columns
            .iter()
            .enumerate()
            .filter_map(|(col, name)| metadata.position(name).map(|pos| (col, pos)))
            .collect();
        if shared.is_empty() {
            return Err(AnalysisError::NoSharedSamples(cmp.name.clone()));
        }
        let excluded = cmp.count_columns.len() - shared.len();
        if excluded > 0 {
            warn!(
                "Comparison '{}': {excluded} column(s) not in sample metadata were ignored",
                cmp.name
            );
        }

        let rows: Vec<usize> = cmp
            .genes
            .iter()
            .map(|g| {
                *gene_rows.entry(g.gene_id.clone()).or_insert_with(|| {
                    genes.push(g.gene_id.clone());
                    genes.len() - 1
                })
            })
            .collect();

        for (col, pos) in shared {
            seen_samples[pos] = true;
            for (row, value) in rows.iter().zip(cmp.counts(col)?) {
                if let Some(v) = value {
                    cells.push((*row, pos, v));
                }
            }
        }
    }

    // Columns follow metadata order, restricted to samples some comparison covered.
    let mut column_of = vec![usize::MAX; metadata.len()];
    let mut samples = Vec::new();
    for (pos, seen) in seen_samples.iter().enumerate() {
        if *seen {
            column_of[pos] = samples.len();
            samples.push(metadata.samples[pos].clone());
        }
    }

    let mut values = Array2::from_elem((genes.len(), samples.len()), None);
    for (row, pos, v) in cells {
        let cell = &mut values[[row, column_of[pos]]];
        if cell.is_none() {
            *cell = Some(v);
        }
    }

    Ok(UnifiedCounts {
        genes,
        samples,
        values,
    })
}

/// Normalize each sample column so its set cells sum to one million.
pub fn counts_per_million(counts: &UnifiedCounts) -> Cpm {
    let mut values = counts.values.clone();
    let mut zero_columns = Vec::new();

    for (sample, mut column) in counts.samples.iter().zip(values.columns_mut()) {
        let total: f64 = column.iter().flatten().sum();
        if total == 0.0 {
            warn!("Sample '{sample}' has zero total counts; its CPM is set to 0");
            zero_columns.push(sample.clone());
            column.map_inplace(|c| {
                if c.is_some() {
                    *c = Some(0.0);
                }
            });
            continue;
        }
        let scale = total / PER_MILLION;
        column.map_inplace(|c| {
            if let Some(v) = c {
                *v /= scale;
            }
        });
    }

    Cpm {
        samples: counts.samples.clone(),
        values,
        zero_columns,
    }
}

/// Distinct values across every annotation cell, regardless of column.
pub fn infer_groups(metadata: &SampleMetadata) -> BTreeSet<MetadataValue> {
    metadata
        .annotations
        .iter()
        .flat_map(|row| row.values().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Table;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn metadata() -> SampleMetadata {
        SampleMetadata::from_table(&table(
            &["sample", "G"],
            &[&["A", "x"], &["B", "y"], &["C", "x"]],
        ))
        .unwrap()
    }

    /// Rows are `[gene, count per sample...]`.
    fn comparison(name: &str, samples: &[&str], rows: &[&[&str]]) -> ComparisonResult {
        let mut headers = vec!["GeneID", "logFC", "PValue", "FDR"];
        headers.extend_from_slice(samples);
        let body: Vec<Vec<String>> = rows
            .iter()
            .map(|cells| {
                let mut r = vec![cells[0].to_string(), "1".into(), "0.01".into(), "0.02".into()];
                r.extend(cells[1..].iter().map(|c| c.to_string()));
                r
            })
            .collect();
        let t = Table::new(headers.iter().map(|s| s.to_string()).collect(), body);
        ComparisonResult::from_table(name, &t).unwrap()
    }

    #[test]
    fn test_single_comparison_scenario() {
        let cmp = comparison("c1", &["A", "B"], &[&["g1", "10", "20"], &["g2", "5", "15"]]);
        let counts = unify_counts(&metadata(), &[cmp]).unwrap();
        assert_eq!(counts.genes, vec!["g1", "g2"]);
        assert_eq!(counts.samples, vec!["A", "B"]);
        assert_eq!(counts.get("g1", "A"), Some(10.0));
        assert_eq!(counts.get("g1", "B"), Some(20.0));
        assert_eq!(counts.get("g2", "A"), Some(5.0));
        assert_eq!(counts.get("g2", "B"), Some(15.0));
        assert_eq!(counts.sample_index("C"), None);
    }

    #[test]
    fn test_union_of_genes_and_samples() {
        let c1 = comparison("c1", &["A", "B", "Z"], &[&["g1", "1", "2", "9"]]);
        let c2 = comparison("c2", &["C"], &[&["g2", "3"], &["g1", "4"]]);
        let counts = unify_counts(&metadata(), &[c1, c2]).unwrap();

        let genes: BTreeSet<&str> = counts.genes.iter().map(|s| s.as_str()).collect();
        assert_eq!(genes, BTreeSet::from(["g1", "g2"]));
        assert_eq!(counts.samples, vec!["A", "B", "C"]);
        assert_eq!(counts.get("g2", "A"), None);
        assert_eq!(counts.get("g1", "C"), Some(4.0));
    }

    #[test]
    fn test_overlapping_cells_keep_first() {
        let c1 = comparison("c1", &["A"], &[&["g1", "7"]]);
        let c2 = comparison("c2", &["A"], &[&["g1", "99"]]);
        let counts = unify_counts(&metadata(), &[c1, c2]).unwrap();
        assert_eq!(counts.get("g1", "A"), Some(7.0));
    }

    #[test]
    fn test_no_shared_samples_fails() {
        let cmp = comparison("orphan", &["X", "Y"], &[&["g1", "1", "2"]]);
        let err = unify_counts(&metadata(), &[cmp]).unwrap_err();
        assert_eq!(err, AnalysisError::NoSharedSamples("orphan".into()));
    }

    #[test]
    fn test_cpm_columns_sum_to_one_million() {
        let cmp = comparison(
            "c1",
            &["A", "B", "C"],
            &[&["g1", "10", "0", "3"], &["g2", "30", "0", ""], &["g3", "60", "0", "1"]],
        );
        let counts = unify_counts(&metadata(), &[cmp]).unwrap();
        let cpm = counts_per_million(&counts);

        let sum_a: f64 = cpm.values.column(0).iter().flatten().sum();
        let sum_c: f64 = cpm.values.column(2).iter().flatten().sum();
        assert!((sum_a - 1e6).abs() < 1e-6);
        assert!((sum_c - 1e6).abs() < 1e-6);
        assert!((cpm.values[[0, 0]].unwrap() - 100_000.0).abs() < 1e-6);
        assert_eq!(cpm.values[[1, 2]], None);

        assert_eq!(cpm.zero_columns, vec!["B"]);
        assert!(cpm.values.column(1).iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn test_infer_groups_spans_all_columns() {
        let meta = SampleMetadata::from_table(&table(
            &["sample", "G", "batch"],
            &[&["A", "x", "1"], &["B", "y", "2"], &["C", "x", "1"]],
        ))
        .unwrap();
        let groups = infer_groups(&meta);
        let expected = BTreeSet::from([
            MetadataValue::String("x".into()),
            MetadataValue::String("y".into()),
            MetadataValue::Integer(1),
            MetadataValue::Integer(2),
        ]);
        assert_eq!(groups, expected);
    }

    #[test]
    fn test_aggregate_sorts_comparisons() {
        let b = comparison("b_vs_c", &["B"], &[&["g2", "1"]]);
        let a = comparison("a_vs_c", &["A"], &[&["g1", "1"]]);
        let ds = aggregate(metadata(), vec![b, a]).unwrap();
        assert_eq!(ds.comparisons[0].name, "a_vs_c");
        assert_eq!(ds.counts.genes, vec!["g1", "g2"]);
        assert!(ds.comparison("b_vs_c").is_some());
    }
}
