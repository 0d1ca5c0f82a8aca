use efficient_pca::PCA;
use log::debug;
use ndarray::Array2;

use super::aggregate::Cpm;
use crate::error::AnalysisError;

pub const MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PcaOptions {
    /// Use `log2(cpm + 1)` instead of raw CPM.
    pub log_transform: bool,
}

/// Sample scores on the principal components, strongest first.
#[derive(Debug, Clone)]
pub struct PcaResult {
    pub samples: Vec<String>,
    /// samples × components
    pub scores: Array2<f64>,
    /// Percent of total variance per component.
    pub explained: Vec<f64>,
    pub genes_used: usize,
}

impl PcaResult {
    /// `PC1 (42.0%)` style label for a zero-based component.
    pub fn axis_label(&self, component: usize) -> String {
        let pct = self.explained.get(component).copied().unwrap_or(0.0);
        format!("PC{} ({pct:.1}%)", component + 1)
    }

    /// `(PC1, PC2)` for each sample, in `samples` order.
    pub fn top_two(&self) -> Vec<[f64; 2]> {
        self.scores
            .rows()
            .into_iter()
            .map(|r| {
                let at = |k: usize| r.get(k).copied().unwrap_or(0.0);
                [at(0), at(1)]
            })
            .collect()
    }
}

/// PCA of the selected CPM columns.
///
/// Genes unset in any selected sample, or constant across them, are left out.
pub fn run_pca(
    cpm: &Cpm,
    selected: &[String],
    options: PcaOptions,
) -> Result<PcaResult, AnalysisError> {
    if selected.len() < MIN_SAMPLES {
        return Err(AnalysisError::TooFewSamples {
            needed: MIN_SAMPLES,
            got: selected.len(),
        });
    }
    let columns: Vec<usize> = selected
        .iter()
        .filter_map(|s| cpm.samples.iter().position(|c| c == s))
        .collect();
    if columns.len() < MIN_SAMPLES {
        return Err(AnalysisError::TooFewSamples {
            needed: MIN_SAMPLES,
            got: columns.len(),
        });
    }
    let samples: Vec<String> = columns.iter().map(|&c| cpm.samples[c].clone()).collect();

    let mut features: Vec<f64> = Vec::new();
    let mut genes_used = 0;
    for row in cpm.values.rows() {
        let values: Option<Vec<f64>> = columns.iter().map(|&c| row[c]).collect();
        let Some(mut values) = values else { continue };
        if options.log_transform {
            values.iter_mut().for_each(|v| *v = (*v + 1.0).log2());
        }
        let first = values[0];
        if values.iter().all(|v| *v == first) {
            continue;
        }
        features.extend(values);
        genes_used += 1;
    }
    if genes_used == 0 {
        return Err(AnalysisError::NoInformativeGenes);
    }

    // genes × samples, transposed to samples × genes
    let data = Array2::from_shape_vec((genes_used, samples.len()), features)
        .map_err(|_| AnalysisError::NoInformativeGenes)?
        .reversed_axes();
    debug!("PCA over {} samples x {genes_used} genes", samples.len());

    let (scores, explained) = principal_components(data)?;
    Ok(PcaResult {
        samples,
        scores,
        explained,
        genes_used,
    })
}

/// Principal components of a samples × features matrix.
///
/// Returns the score matrix (samples × components) and the percent variance
/// explained per component.
pub fn principal_components(
    data: Array2<f64>,
) -> Result<(Array2<f64>, Vec<f64>), AnalysisError> {
    let mut model = PCA::new();
    model
        .fit(data.clone(), None)
        .map_err(|e| AnalysisError::Pca(e.to_string()))?;
    let mut scores = model
        .transform(data)
        .map_err(|e| AnalysisError::Pca(e.to_string()))?;
    if scores.ncols() == 0 {
        return Err(AnalysisError::NoInformativeGenes);
    }
    normalize_signs(&mut scores);
    let explained = explained_variance(&scores);
    Ok((scores, explained))
}

/// Flip each component so its largest-magnitude score is positive.
fn normalize_signs(scores: &mut Array2<f64>) {
    for mut column in scores.columns_mut() {
        let pivot = column
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
}

/// Percent of the total score variance carried by each component.
fn explained_variance(scores: &Array2<f64>) -> Vec<f64> {
    let variances: Vec<f64> = scores
        .columns()
        .into_iter()
        .map(|column| {
            let mean = column.mean().unwrap_or(0.0);
            column.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        })
        .collect();
    let total: f64 = variances.iter().sum();
    variances
        .iter()
        .map(|v| if total > 0.0 { v / total * 100.0 } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cpm(samples: &[&str], rows: Vec<Vec<Option<f64>>>) -> Cpm {
        let n_genes = rows.len();
        let flat: Vec<Option<f64>> = rows.into_iter().flatten().collect();
        Cpm {
            samples: samples.iter().map(|s| s.to_string()).collect(),
            values: Array2::from_shape_vec((n_genes, samples.len()), flat).unwrap(),
            zero_columns: Vec::new(),
        }
    }

    fn names(s: &[&str]) -> Vec<String> {
        s.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_two_samples_is_an_error() {
        let m = cpm(&["A", "B"], vec![vec![Some(1.0), Some(2.0)]]);
        let err = run_pca(&m, &names(&["A", "B"]), PcaOptions::default()).unwrap_err();
        assert_eq!(err, AnalysisError::TooFewSamples { needed: 3, got: 2 });
        assert!(err.to_string().contains("need at least 3 samples"));
    }

    #[test]
    fn test_unknown_samples_do_not_count() {
        let m = cpm(&["A", "B", "C"], vec![vec![Some(1.0), Some(2.0), Some(4.0)]]);
        let err = run_pca(&m, &names(&["A", "B", "Q"]), PcaOptions::default()).unwrap_err();
        assert_eq!(err, AnalysisError::TooFewSamples { needed: 3, got: 2 });
    }

    #[test]
    fn test_explained_variance_from_scores() {
        // Column variances (sum of squares about the mean): 8, 2, 0
        let scores = array![[2.0, 1.0, 0.0], [-2.0, -1.0, 0.0], [0.0, 0.0, 0.0]];
        let explained = explained_variance(&scores);
        assert!((explained[0] - 80.0).abs() < 1e-9);
        assert!((explained[1] - 20.0).abs() < 1e-9);
        assert_eq!(explained[2], 0.0);
        assert_eq!(explained_variance(&Array2::zeros((3, 2))), vec![0.0, 0.0]);
    }

    #[test]
    fn test_signs_follow_largest_score() {
        let mut scores = array![[1.0, -3.0], [-4.0, 2.0], [3.0, 1.0]];
        normalize_signs(&mut scores);
        assert_eq!(scores, array![[-1.0, 3.0], [4.0, -2.0], [-3.0, -1.0]]);
    }

    #[test]
    fn test_explained_variance_sums_to_hundred() {
        let data = array![
            [1.0, 0.5, 3.0, 2.0],
            [2.0, 1.5, 0.0, 1.0],
            [0.0, 4.0, 1.0, 2.5],
            [3.0, 2.0, 2.0, 0.5]
        ];
        let (scores, explained) = principal_components(data).unwrap();
        assert_eq!(scores.nrows(), 4);
        let sum: f64 = explained.iter().sum();
        assert!((sum - 100.0).abs() < 1e-6);
        assert!(explained[0] >= explained[1]);
        for column in scores.columns() {
            let pivot = column
                .iter()
                .copied()
                .fold(0.0_f64, |b, v| if v.abs() > b.abs() { v } else { b });
            assert!(pivot >= 0.0);
        }
    }

    #[test]
    fn test_run_pca_skips_incomplete_and_constant_genes() {
        let m = cpm(
            &["A", "B", "C"],
            vec![
                vec![Some(1.0), Some(2.0), Some(6.0)],
                vec![Some(5.0), None, Some(1.0)],
                vec![Some(3.0), Some(3.0), Some(3.0)],
                vec![Some(2.0), Some(4.0), Some(12.0)],
            ],
        );
        let result = run_pca(&m, &names(&["A", "B", "C"]), PcaOptions::default()).unwrap();
        assert_eq!(result.genes_used, 2);
        assert_eq!(result.samples, vec!["A", "B", "C"]);
        assert_eq!(result.axis_label(0), "PC1 (100.0%)");
        assert_eq!(result.axis_label(1), "PC2 (0.0%)");
        assert_eq!(result.top_two().len(), 3);
    }

    #[test]
    fn test_no_informative_genes() {
        let m = cpm(&["A", "B", "C"], vec![vec![Some(1.0), Some(1.0), Some(1.0)]]);
        let err = run_pca(&m, &names(&["A", "B", "C"]), PcaOptions { log_transform: true })
            .unwrap_err();
        assert_eq!(err, AnalysisError::NoInformativeGenes);
    }
}
