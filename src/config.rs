//! Configuration file handling.
//!
//! Settings come from `.de-viewer.toml` in the working directory, or from
//! the file named by `DE_VIEWER_CONFIG`. Every section is optional.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::volcano::Cutoffs;
use crate::data::loader::Separator;

pub const DEFAULT_FILE: &str = ".de-viewer.toml";
pub const ENV_VAR: &str = "DE_VIEWER_CONFIG";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Domain name → portal root directory.
    #[serde(default = "default_domains")]
    pub domains: BTreeMap<String, PathBuf>,

    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub de: DeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domains: default_domains(),
            portal: PortalConfig::default(),
            viewer: ViewerConfig::default(),
            de: DeConfig::default(),
        }
    }
}

fn default_domains() -> BTreeMap<String, PathBuf> {
    BTreeMap::from([("local".to_string(), PathBuf::from("."))])
}

/// How datasets are recognised inside a portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Process types shown in the DE view. Empty shows every dataset.
    #[serde(default)]
    pub dataset_types: Vec<String>,

    /// File names accepted as the sample metadata table, in priority order.
    #[serde(default = "default_metadata_files")]
    pub metadata_files: Vec<String>,

    /// File name suffixes of per-comparison result tables.
    #[serde(default = "default_results_suffixes")]
    pub results_suffixes: Vec<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            dataset_types: Vec::new(),
            metadata_files: default_metadata_files(),
            results_suffixes: default_results_suffixes(),
        }
    }
}

fn default_metadata_files() -> Vec<String> {
    vec!["metadata.csv", "samplesheet.csv", "metadata.tsv", "samplesheet.tsv"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_results_suffixes() -> Vec<String> {
    vec![".results.csv", ".results.tsv"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Generic table viewer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub default_sep: Separator,

    /// Rows rendered in the table view.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_sep: Separator::default(),
            max_rows: default_max_rows(),
        }
    }
}

fn default_max_rows() -> usize {
    1000
}

/// Differential expression defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeConfig {
    #[serde(default = "default_fdr_cutoff")]
    pub fdr_cutoff: f64,

    #[serde(default = "default_lfc_cutoff")]
    pub lfc_cutoff: f64,

    /// PCA on log2(CPM + 1).
    #[serde(default)]
    pub log_transform: bool,
}

impl Default for DeConfig {
    fn default() -> Self {
        Self {
            fdr_cutoff: default_fdr_cutoff(),
            lfc_cutoff: default_lfc_cutoff(),
            log_transform: false,
        }
    }
}

fn default_fdr_cutoff() -> f64 {
    0.05
}

fn default_lfc_cutoff() -> f64 {
    1.0
}

impl DeConfig {
    pub fn cutoffs(&self) -> Cutoffs {
        Cutoffs {
            fdr: self.fdr_cutoff,
            lfc: self.lfc_cutoff,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `DE_VIEWER_CONFIG` if set, else from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        if let Some(path) = std::env::var_os(ENV_VAR) {
            return Self::load(Path::new(&path)).map(Some);
        }
        let default_path = Path::new(DEFAULT_FILE);
        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Root directory of a configured domain.
    pub fn domain_root(&self, domain: &str) -> Option<&Path> {
        self.domains.get(domain).map(|p| p.as_path())
    }
}
