use thiserror::Error;

/// Validation failures raised while assembling or analysing a DE dataset.
///
/// These are the checkpoints a user can hit by picking the wrong files or
/// too narrow a selection; the UI shows the message verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("sample metadata table is empty")]
    EmptyMetadata,
    #[error("sample '{0}' appears more than once in the metadata")]
    DuplicateSample(String),
    #[error("comparison '{comparison}' is missing the required column '{column}'")]
    MissingColumn { comparison: String, column: String },
    #[error("comparison '{comparison}', row {row}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        comparison: String,
        row: usize,
        column: String,
        value: String,
    },
    #[error("comparison '{0}' shares no sample columns with the sample metadata")]
    NoSharedSamples(String),
    #[error("need at least {needed} samples for PCA, but only {got} selected")]
    TooFewSamples { needed: usize, got: usize },
    #[error("no gene has complete, non-constant values across the selected samples")]
    NoInformativeGenes,
    #[error("PCA failed: {0}")]
    Pca(String),
    #[error("dataset '{0}' has no sample metadata file")]
    MissingMetadata(String),
    #[error("dataset '{0}' has no comparison results")]
    NoComparisons(String),
}
