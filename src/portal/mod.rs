/// Portal layer: browsing projects → datasets → files.
///
/// ```text
///   Selection (domain, project, dataset, file, sep)  ⇄  query string
///        │
///        ▼
///   ┌────────────┐
///   │ DataPortal │  list_projects / list_datasets / list_files / read_table
///   └────────────┘
///        │  LocalPortal: <root>/<project>/<dataset>/<file...>
///        ▼
///   load_de_dataset → DeDataset
/// ```

pub mod local;
pub mod query;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::analysis::aggregate::{DeDataset, aggregate};
use crate::config::PortalConfig;
use crate::data::loader::Separator;
use crate::data::model::{ComparisonResult, SampleMetadata, Table};
use crate::error::AnalysisError;

pub use local::LocalPortal;
pub use query::Selection;

/// A dataset entry in a project listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    /// Process type that produced the dataset; empty when unknown.
    pub process: String,
}

/// Read-only access to a tree of projects, datasets and files.
pub trait DataPortal {
    /// Project ids, sorted.
    fn list_projects(&self) -> Result<Vec<String>>;

    /// Datasets of a project, sorted by name.
    fn list_datasets(&self, project: &str) -> Result<Vec<DatasetInfo>>;

    /// `/`-separated file paths relative to the dataset, sorted.
    fn list_files(&self, project: &str, dataset: &str) -> Result<Vec<String>>;

    /// Read one file as a table. `sep` only applies to delimited text.
    fn read_table(&self, project: &str, dataset: &str, file: &str, sep: Separator)
        -> Result<Table>;
}

/// Keep datasets whose process type is listed; an empty list keeps all.
pub fn filter_datasets(datasets: &[DatasetInfo], types: &[String]) -> Vec<DatasetInfo> {
    datasets
        .iter()
        .filter(|d| types.is_empty() || types.contains(&d.process))
        .cloned()
        .collect()
}

/// Last path component of a `/`-separated file path.
fn base_name(file: &str) -> &str {
    file.rsplit('/').next().unwrap_or(file)
}

/// Separator for a DE input file, from its extension (comma by default).
fn sep_for(file: &str) -> Separator {
    Separator::from_extension(std::path::Path::new(file)).unwrap_or_default()
}

/// Locate, read and aggregate the DE inputs of one dataset.
///
/// The metadata table is the shallowest file whose name is listed in
/// `config.metadata_files` (earlier names win at equal depth). Each file
/// inside a sub-folder whose name ends with a results suffix is one
/// comparison, named after that folder.
pub fn load_de_dataset(
    portal: &dyn DataPortal,
    project: &str,
    dataset: &str,
    config: &PortalConfig,
) -> Result<DeDataset> {
    let files = portal.list_files(project, dataset)?;
    debug!("Dataset {project}/{dataset}: {} files", files.len());

    let metadata_file = files
        .iter()
        .filter_map(|f| {
            let rank = config
                .metadata_files
                .iter()
                .position(|m| m == base_name(f))?;
            Some((f.matches('/').count(), rank, f))
        })
        .min()
        .map(|(_, _, f)| f.clone())
        .ok_or_else(|| AnalysisError::MissingMetadata(dataset.to_string()))?;

    let table = portal
        .read_table(project, dataset, &metadata_file, sep_for(&metadata_file))
        .with_context(|| format!("reading sample metadata {metadata_file}"))?;
    let metadata = SampleMetadata::from_table(&table)?;

    let mut comparisons: Vec<ComparisonResult> = Vec::new();
    for file in &files {
        let parts: Vec<&str> = file.split('/').collect();
        if parts.len() < 2 {
            continue;
        }
        let name = base_name(file);
        if !config.results_suffixes.iter().any(|s| name.ends_with(s.as_str())) {
            continue;
        }
        let folder = parts[parts.len() - 2];
        if comparisons.iter().any(|c| c.name == folder) {
            warn!("Comparison '{folder}' has more than one results file; ignoring {file}");
            continue;
        }
        let table = portal
            .read_table(project, dataset, file, sep_for(file))
            .with_context(|| format!("reading comparison {file}"))?;
        comparisons.push(ComparisonResult::from_table(folder, &table)?);
    }
    if comparisons.is_empty() {
        return Err(AnalysisError::NoComparisons(dataset.to_string()).into());
    }

    Ok(aggregate(metadata, comparisons)?)
}
